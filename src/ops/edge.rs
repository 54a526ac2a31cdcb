//! Block-wise Canny-style edge detection.

use crate::core::error::{BlockflowResult, ConfigError, OpResult};
use crate::core::types::{Scalar, Vec3};
use crate::core::volume::Volume;
use crate::dispatch::{BlockDispatcher, ConvergenceDriver, ConvergenceOutcome};
use crate::kernels;
use crate::ops::{BlockContext, BlockOp, BlockReport, JobType, ThresholdOp, PIXELS_CHANGED};

/// Gradient-magnitude classification pass.
///
/// Smooths with a Gaussian of scale `sigma`, then marks each pixel strong,
/// weak or background by its gradient magnitude against the two thresholds.
/// Runs once; the hysteresis linking is done by [`EdgeTrackOp`].
#[derive(Debug, Clone)]
pub struct GradientOp {
    sigma: f64,
    lower: f64,
    upper: f64,
}

impl GradientOp {
    /// Fails on a non-positive sigma or inverted thresholds.
    pub fn new(sigma: f64, lower: f64, upper: f64) -> Result<Self, ConfigError> {
        if !(sigma > 0.0) {
            return Err(ConfigError::InvalidSigma { sigma });
        }
        if lower > upper {
            return Err(ConfigError::InvalidThresholds { lower, upper });
        }
        Ok(Self { sigma, lower, upper })
    }
}

impl<T: Scalar> BlockOp<T> for GradientOp {
    fn name(&self) -> &str {
        "gradientclassify"
    }

    fn margin(&self) -> Vec3 {
        // Smoothing support plus the derivative stencil.
        Vec3::splat((3.0 * self.sigma).round() as i64 + 4)
    }

    fn extra_memory(&self) -> f64 {
        // The smoothing buffers are f64 copies of the block.
        3.0 * 8.0 / T::BYTES as f64
    }

    fn job_type(&self) -> JobType {
        JobType::Slow
    }

    fn run(&self, block: &mut Volume<T>, _ctx: &BlockContext) -> OpResult<BlockReport> {
        kernels::gradient_classify(block, self.sigma, self.lower, self.upper);
        Ok(BlockReport::new())
    }
}

/// Hysteresis edge-tracking pass.
///
/// Promotes weak pixels touching a strong pixel until no promotion happens
/// inside the block. Runs under a convergence driver so promotions cross
/// block boundaries via the refreshed margins of the next iteration.
#[derive(Debug, Clone, Default)]
pub struct EdgeTrackOp;

impl<T: Scalar> BlockOp<T> for EdgeTrackOp {
    fn name(&self) -> &str {
        "edgetrack"
    }

    fn margin(&self) -> Vec3 {
        Vec3::splat(3)
    }

    fn extra_memory(&self) -> f64 {
        1.0
    }

    fn can_delay(&self) -> bool {
        false
    }

    fn run(&self, block: &mut Volume<T>, ctx: &BlockContext) -> OpResult<BlockReport> {
        let before = block.region_snapshot(ctx.write_extent);
        kernels::track_edges(block);
        let changed = block.count_region_diff(ctx.write_extent, &before);
        Ok(BlockReport::with_counter(PIXELS_CHANGED, changed as i64))
    }
}

/// Full edge-detection compound.
///
/// Gradient classification, edge tracking to convergence, then a final
/// threshold that keeps strong pixels and drops orphaned weak ones.
pub fn detect_edges<T: Scalar>(
    dispatcher: &dyn BlockDispatcher<T>,
    vol: &mut Volume<T>,
    sigma: f64,
    lower: f64,
    upper: f64,
    driver: &ConvergenceDriver,
) -> BlockflowResult<ConvergenceOutcome> {
    let gradient = GradientOp::new(sigma, lower, upper)?;
    dispatcher.dispatch(vol, &gradient)?;

    let outcome = driver.run(dispatcher, vol, &EdgeTrackOp)?;

    dispatcher.dispatch(vol, &ThresholdOp::new(kernels::WEAK_EDGE))?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::region::Region;

    #[test]
    fn test_rejects_bad_sigma() {
        assert!(matches!(
            GradientOp::new(0.0, 1.0, 2.0),
            Err(ConfigError::InvalidSigma { .. })
        ));
        assert!(matches!(
            GradientOp::new(-1.0, 1.0, 2.0),
            Err(ConfigError::InvalidSigma { .. })
        ));
    }

    #[test]
    fn test_gradient_margin_tracks_sigma() {
        let op = GradientOp::new(2.0, 1.0, 2.0).unwrap();
        assert_eq!(BlockOp::<u8>::margin(&op), Vec3::splat(10));
        let op = GradientOp::new(0.5, 1.0, 2.0).unwrap();
        assert_eq!(BlockOp::<f32>::margin(&op), Vec3::splat(6));
    }

    #[test]
    fn test_edge_track_counts_promotions() {
        let dims = Vec3::new(4, 1, 1);
        let mut v = Volume::from_data(dims, vec![2u8, 1, 1, 0]);
        let ctx = BlockContext {
            block_index: 0,
            block_origin: Vec3::ZERO,
            full_dims: dims,
            write_extent: Region::full(dims),
        };
        let report = BlockOp::<u8>::run(&EdgeTrackOp, &mut v, &ctx).unwrap();
        assert_eq!(report.counter(PIXELS_CHANGED), 2);
        let report = BlockOp::<u8>::run(&EdgeTrackOp, &mut v, &ctx).unwrap();
        assert_eq!(report.counter(PIXELS_CHANGED), 0);
    }
}
