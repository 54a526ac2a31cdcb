//! Block-wise region growing.

use crate::core::error::{ConfigError, OpResult};
use crate::core::types::{Connectivity, Scalar, Vec3};
use crate::core::volume::Volume;
use crate::kernels;
use crate::ops::{BlockContext, BlockOp, BlockReport, JobType, PIXELS_CHANGED};

/// Grow `source`-colored regions into `target`-colored pixels, block-wise.
///
/// One dispatch grows only as far as the block margin allows; run under a
/// convergence driver to propagate growth across block boundaries. Reports
/// [`PIXELS_CHANGED`] counted over the write extent only, so growth that
/// happens purely inside the (discarded) margin does not keep the loop alive.
#[derive(Debug, Clone)]
pub struct GrowOp {
    source: f64,
    target: f64,
    connectivity: Connectivity,
}

impl GrowOp {
    /// Fails if source and target colors coincide.
    pub fn new(source: f64, target: f64, connectivity: Connectivity) -> Result<Self, ConfigError> {
        if source == target {
            return Err(ConfigError::IdenticalColors { color: source });
        }
        Ok(Self {
            source,
            target,
            connectivity,
        })
    }
}

impl<T: Scalar> BlockOp<T> for GrowOp {
    fn name(&self) -> &str {
        "grow"
    }

    fn margin(&self) -> Vec3 {
        // Three planes of overlap per iteration keeps the number of
        // convergence rounds low without inflating block memory much.
        Vec3::splat(3)
    }

    fn extra_memory(&self) -> f64 {
        // Seed stack plus the write-extent snapshot.
        1.0
    }

    fn job_type(&self) -> JobType {
        JobType::Fast
    }

    fn can_delay(&self) -> bool {
        // The convergence driver reads the counter right after the dispatch.
        false
    }

    fn run(&self, block: &mut Volume<T>, ctx: &BlockContext) -> OpResult<BlockReport> {
        let before = block.region_snapshot(ctx.write_extent);
        kernels::grow(
            block,
            T::from_f64(self.source),
            T::from_f64(self.target),
            self.connectivity,
        );
        let changed = block.count_region_diff(ctx.write_extent, &before);
        Ok(BlockReport::with_counter(PIXELS_CHANGED, changed as i64))
    }
}
