//! The convergence driver: dispatch a counted operation until it settles.

use crate::core::error::{BlockflowResult, ProtocolError};
use crate::core::types::Scalar;
use crate::core::volume::Volume;
use crate::dispatch::progress::{ProgressCallback, ProgressUpdate};
use crate::dispatch::BlockDispatcher;
use crate::ops::{BlockOp, BlockReport, PIXELS_CHANGED};

/// Result of a finished convergence loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceOutcome {
    /// Dispatch rounds executed, including the final all-zero round.
    pub iterations: usize,
    /// Sum of the watched counter over all rounds.
    pub total_changed: i64,
}

/// Re-dispatches an operation until a full round reports zero on the watched
/// counter.
///
/// Termination rests on two properties of the counted operations: reports
/// count only write-extent pixels (margin churn cannot keep the loop alive),
/// and each round's changes are monotone (pixels move toward the fixpoint,
/// never away). The iteration cap is a backstop against an operation that
/// violates these; hitting it is an error, not a quiet truncation.
pub struct ConvergenceDriver {
    counter: String,
    max_iterations: usize,
    on_progress: Option<ProgressCallback>,
}

impl Default for ConvergenceDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvergenceDriver {
    /// Driver with default settings.
    pub fn new() -> Self {
        Self {
            counter: PIXELS_CHANGED.to_string(),
            max_iterations: 10_000,
            on_progress: None,
        }
    }

    /// Watch a different counter (default [`PIXELS_CHANGED`]).
    pub fn counter(mut self, key: &str) -> Self {
        self.counter = key.to_string();
        self
    }

    /// Safety cap on rounds (default 10000).
    pub fn max_iterations(mut self, cap: usize) -> Self {
        self.max_iterations = cap;
        self
    }

    /// Install a progress callback.
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    fn emit(&self, update: ProgressUpdate) {
        if let Some(cb) = &self.on_progress {
            cb(&update);
        }
    }

    /// Run `op` to convergence.
    pub fn run<T: Scalar>(
        &self,
        dispatcher: &dyn BlockDispatcher<T>,
        vol: &mut Volume<T>,
        op: &dyn BlockOp<T>,
    ) -> BlockflowResult<ConvergenceOutcome> {
        self.emit(ProgressUpdate::Started {
            op: op.name().to_string(),
        });
        let mut iterations = 0;
        let mut total_changed = 0i64;
        loop {
            let reports = dispatcher.dispatch(vol, op)?;
            let changed = BlockReport::sum_counter(&reports, &self.counter);
            iterations += 1;
            total_changed += changed;
            log::info!("{} round {}: {} {}", op.name(), iterations, changed, self.counter);
            self.emit(ProgressUpdate::IterationCompleted {
                iteration: iterations,
                changed,
            });

            if changed == 0 {
                break;
            }
            if iterations >= self.max_iterations {
                return Err(ProtocolError::IterationCapExceeded {
                    cap: self.max_iterations,
                }
                .into());
            }
        }
        self.emit(ProgressUpdate::Converged {
            iterations,
            total_changed,
        });
        Ok(ConvergenceOutcome {
            iterations,
            total_changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{DispatchResult, OpResult};
    use crate::core::region::Region;
    use crate::core::types::Vec3;
    use crate::ops::BlockContext;
    use parking_lot::Mutex;

    /// Dispatcher that runs the op once over the whole image as one block.
    struct WholeImage;

    impl<T: Scalar> BlockDispatcher<T> for WholeImage {
        fn dispatch(&self, vol: &mut Volume<T>, op: &dyn BlockOp<T>) -> DispatchResult<Vec<BlockReport>> {
            let dims = vol.dims();
            let ctx = BlockContext {
                block_index: 0,
                block_origin: Vec3::ZERO,
                full_dims: dims,
                write_extent: Region::full(dims),
            };
            let report = op
                .run(vol, &ctx)
                .map_err(|error| crate::core::error::DispatchError::BlockFailed {
                    block_index: 0,
                    error,
                })?;
            Ok(vec![report])
        }
    }

    /// Reports a fixed descending sequence of counts, then zeroes.
    struct Countdown {
        remaining: Mutex<Vec<i64>>,
    }

    impl BlockOp<u8> for Countdown {
        fn name(&self) -> &str {
            "countdown"
        }
        fn can_delay(&self) -> bool {
            false
        }
        fn run(&self, _block: &mut Volume<u8>, _ctx: &BlockContext) -> OpResult<BlockReport> {
            let next = self.remaining.lock().pop().unwrap_or(0);
            Ok(BlockReport::with_counter(PIXELS_CHANGED, next))
        }
    }

    #[test]
    fn test_runs_until_zero_round() {
        let op = Countdown {
            remaining: Mutex::new(vec![0, 1, 5]),
        };
        let mut vol: Volume<u8> = Volume::new(Vec3::splat(2));
        let log = crate::dispatch::ProgressLog::new();
        let driver = ConvergenceDriver::new().on_progress(log.callback());
        let outcome = driver.run(&WholeImage, &mut vol, &op).unwrap();
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.total_changed, 6);
        // Started, two counted rounds, the zero round, converged.
        assert_eq!(log.updates().len(), 5);
    }

    #[test]
    fn test_iteration_cap_is_an_error() {
        struct Never;
        impl BlockOp<u8> for Never {
            fn name(&self) -> &str {
                "never"
            }
            fn run(&self, _b: &mut Volume<u8>, _c: &BlockContext) -> OpResult<BlockReport> {
                Ok(BlockReport::with_counter(PIXELS_CHANGED, 1))
            }
        }
        let mut vol: Volume<u8> = Volume::new(Vec3::splat(2));
        let driver = ConvergenceDriver::new().max_iterations(5);
        let err = driver.run(&WholeImage, &mut vol, &Never).unwrap_err();
        assert!(err.to_string().contains("5 iteration"));
    }
}
