//! Threshold operations and the hysteresis-threshold compound.

use crate::core::error::{BlockflowResult, ConfigError, OpResult};
use crate::core::types::{Connectivity, Scalar};
use crate::core::volume::Volume;
use crate::dispatch::{BlockDispatcher, ConvergenceDriver, ConvergenceOutcome};
use crate::kernels;
use crate::ops::{BlockContext, BlockOp, BlockReport, GrowOp, JobType};

/// Pointwise binarization: pixels above the threshold become 1, the rest 0.
#[derive(Debug, Clone)]
pub struct ThresholdOp {
    threshold: f64,
}

impl ThresholdOp {
    /// Binarize against the given threshold.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl<T: Scalar> BlockOp<T> for ThresholdOp {
    fn name(&self) -> &str {
        "threshold"
    }

    fn job_type(&self) -> JobType {
        JobType::Fast
    }

    fn run(&self, block: &mut Volume<T>, _ctx: &BlockContext) -> OpResult<BlockReport> {
        kernels::threshold(block, self.threshold);
        Ok(BlockReport::new())
    }
}

/// Pointwise three-class split: above `upper` becomes 2, above `lower`
/// becomes 1, the rest 0.
#[derive(Debug, Clone)]
pub struct DoubleThresholdOp {
    lower: f64,
    upper: f64,
}

impl DoubleThresholdOp {
    /// Fails if `lower` exceeds `upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Self, ConfigError> {
        if lower > upper {
            return Err(ConfigError::InvalidThresholds { lower, upper });
        }
        Ok(Self { lower, upper })
    }
}

impl<T: Scalar> BlockOp<T> for DoubleThresholdOp {
    fn name(&self) -> &str {
        "doublethreshold"
    }

    fn job_type(&self) -> JobType {
        JobType::Fast
    }

    fn run(&self, block: &mut Volume<T>, _ctx: &BlockContext) -> OpResult<BlockReport> {
        kernels::double_threshold(block, self.lower, self.upper);
        Ok(BlockReport::new())
    }
}

/// Hysteresis threshold: a three-stage compound.
///
/// 1. Double threshold into sure (2) / maybe (1) / background (0).
/// 2. Grow the sure class into the maybe class (6-connected) under the
///    convergence driver, so acceptance propagates across block boundaries.
/// 3. Threshold at 1 to turn surviving sure pixels into a binary mask;
///    unreached maybe pixels drop back to background.
///
/// Returns the outcome of the growth loop.
pub fn dual_threshold<T: Scalar>(
    dispatcher: &dyn BlockDispatcher<T>,
    vol: &mut Volume<T>,
    lower: f64,
    upper: f64,
    driver: &ConvergenceDriver,
) -> BlockflowResult<ConvergenceOutcome> {
    let split = DoubleThresholdOp::new(lower, upper)?;
    dispatcher.dispatch(vol, &split)?;

    let grow = GrowOp::new(2.0, 1.0, Connectivity::Nearest)?;
    let outcome = driver.run(dispatcher, vol, &grow)?;

    dispatcher.dispatch(vol, &ThresholdOp::new(1.0))?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::region::Region;
    use crate::core::types::Vec3;

    fn ctx(dims: Vec3) -> BlockContext {
        BlockContext {
            block_index: 0,
            block_origin: Vec3::ZERO,
            full_dims: dims,
            write_extent: Region::full(dims),
        }
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        assert!(matches!(
            DoubleThresholdOp::new(5.0, 1.0),
            Err(ConfigError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn test_threshold_op_binarizes() {
        let dims = Vec3::new(4, 1, 1);
        let mut v = Volume::from_data(dims, vec![0u8, 1, 2, 3]);
        let op = ThresholdOp::new(1.0);
        BlockOp::<u8>::run(&op, &mut v, &ctx(dims)).unwrap();
        assert_eq!(v.data(), &[0, 0, 1, 1]);
    }

    #[test]
    fn test_double_threshold_op_classes() {
        let dims = Vec3::new(4, 1, 1);
        let mut v = Volume::from_data(dims, vec![10u8, 60, 110, 200]);
        let op = DoubleThresholdOp::new(50.0, 100.0).unwrap();
        BlockOp::<u8>::run(&op, &mut v, &ctx(dims)).unwrap();
        assert_eq!(v.data(), &[0, 1, 2, 2]);
    }
}
