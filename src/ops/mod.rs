//! The distributable-operation contract and the concrete block operations.
//!
//! An operation implements [`BlockOp`] to be runnable block-wise: it declares
//! the margin it must read beyond its write region, a working-memory
//! estimate, a scheduler job class, delay eligibility, and an optional
//! cheap "does this block need to run" predicate. The dispatcher owns block
//! enumeration and read/write region handling; the operation only ever sees
//! one materialized block buffer.

pub mod edge;
pub mod floodfill;
pub mod grow;
pub mod registry;
pub mod threshold;

pub use edge::{detect_edges, EdgeTrackOp, GradientOp};
pub use floodfill::{FillOutcome, FloodFill, FloodFillBlockOp};
pub use grow::GrowOp;
pub use registry::{OpParams, OpRegistry};
pub use threshold::{dual_threshold, DoubleThresholdOp, ThresholdOp};

use crate::core::error::OpResult;
use crate::core::region::Region;
use crate::core::types::{Scalar, Vec3};
use crate::core::volume::Volume;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Counter key reported by convergence-counted operations.
pub const PIXELS_CHANGED: &str = "pixels changed";

/// Coarse job classification consumed by the executor's placement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Short job, may be packed densely.
    Fast,
    /// Default classification.
    Normal,
    /// Long-running job.
    Slow,
}

/// Per-block result returned to the orchestration layer.
///
/// Counters are addressed by exact key (no text scanning); free-form
/// messages exist for human consumption only. Reports are additive: the
/// convergence driver sums one named counter across all blocks of an
/// iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockReport {
    /// Free-form progress/diagnostic lines.
    pub messages: Vec<String>,
    /// Named integer counters, aggregated additively across blocks.
    pub counters: IndexMap<String, i64>,
}

impl BlockReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a report carrying one counter.
    pub fn with_counter(key: &str, value: i64) -> Self {
        let mut report = Self::new();
        report.add(key, value);
        report
    }

    /// Add to a named counter (creating it at zero first).
    pub fn add(&mut self, key: &str, value: i64) {
        *self.counters.entry(key.to_string()).or_insert(0) += value;
    }

    /// Value of a named counter, zero if absent.
    pub fn counter(&self, key: &str) -> i64 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    /// Append a message line.
    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Sum one named counter over a batch of reports.
    pub fn sum_counter(reports: &[BlockReport], key: &str) -> i64 {
        reports.iter().map(|r| r.counter(key)).sum()
    }

    /// Serialize to the JSON wire form used by out-of-process executors.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialize from the JSON wire form.
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

/// Everything a block job knows about its place in the full image.
///
/// Created per dispatch and discarded after the block's job runs.
#[derive(Debug, Clone)]
pub struct BlockContext {
    /// Index of this block in dispatch order.
    pub block_index: usize,
    /// Global coordinates of the block buffer's origin (the read region's
    /// origin, so margins shift it below the write region).
    pub block_origin: Vec3,
    /// Dimensions of the original full image, needed for boundary-adjacency
    /// decisions.
    pub full_dims: Vec3,
    /// Block-local sub-region whose pixels are written back; everything
    /// outside it is margin and is discarded after the run.
    pub write_extent: Region,
}

/// Contract an operation implements to be run block-wise.
pub trait BlockOp<T: Scalar>: Send + Sync {
    /// Stable operation name, used in logs and registry lookups.
    fn name(&self) -> &str;

    /// Read-region overlap needed beyond the write region, per axis.
    fn margin(&self) -> Vec3 {
        Vec3::ZERO
    }

    /// Estimated extra working memory as a multiplier of one block's pixel
    /// buffer. Best effort; consumed by admission control.
    fn extra_memory(&self) -> f64 {
        0.0
    }

    /// Scheduler placement class.
    fn job_type(&self) -> JobType {
        JobType::Normal
    }

    /// True if the output may be deferred/fused with adjacent stages. Must
    /// be false when a later stage inspects the result synchronously, e.g.
    /// any counter that gates a convergence loop.
    fn can_delay(&self) -> bool {
        true
    }

    /// Cheap short-circuit: return false when running this block would
    /// provably be a no-op. Cost optimization only; skipping must be
    /// behaviorally equivalent to running and producing no change.
    fn needs_to_run_block(&self, _read: &Region, _write: &Region, _block_index: usize) -> bool {
        true
    }

    /// Execute on one materialized block buffer. The buffer contains the
    /// read region; results must land inside `ctx.write_extent` (margin
    /// writes are discarded). Any error fails the whole block job.
    fn run(&self, block: &mut Volume<T>, ctx: &BlockContext) -> OpResult<BlockReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counters() {
        let mut r = BlockReport::new();
        r.add(PIXELS_CHANGED, 5);
        r.add(PIXELS_CHANGED, 2);
        assert_eq!(r.counter(PIXELS_CHANGED), 7);
        assert_eq!(r.counter("missing"), 0);
    }

    #[test]
    fn test_sum_counter_over_blocks() {
        let reports = vec![
            BlockReport::with_counter(PIXELS_CHANGED, 3),
            BlockReport::new(),
            BlockReport::with_counter(PIXELS_CHANGED, 4),
        ];
        assert_eq!(BlockReport::sum_counter(&reports, PIXELS_CHANGED), 7);
    }

    #[test]
    fn test_wire_roundtrip() {
        let mut r = BlockReport::with_counter(PIXELS_CHANGED, 11);
        r.push_message("11 pixels changed");
        let json = r.to_json().unwrap();
        let back = BlockReport::from_json(&json).unwrap();
        assert_eq!(back.counter(PIXELS_CHANGED), 11);
        assert_eq!(back.messages, vec!["11 pixels changed".to_string()]);
    }
}
