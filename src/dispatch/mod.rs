//! Block enumeration, job execution and convergence driving.
//!
//! The dispatcher owns how a full image is divided into blocks and how block
//! jobs run; operations never see more than one block. [`LocalExecutor`] is
//! the in-process implementation. [`ConvergenceDriver`] re-dispatches a
//! counted operation until a full round reports no change.

mod convergence;
mod executor;
mod progress;

pub use convergence::{ConvergenceDriver, ConvergenceOutcome};
pub use executor::LocalExecutor;
pub use progress::{ProgressCallback, ProgressLog, ProgressUpdate};

use crate::core::error::DispatchResult;
use crate::core::types::Scalar;
use crate::core::volume::Volume;
use crate::ops::{BlockOp, BlockReport};

/// Runs one operation over every block of an image, once.
///
/// A dispatch is a hard barrier: every block job reads the image as it was
/// when the dispatch began, and no write-back happens until all jobs of the
/// round have finished. Cross-block effects therefore always take one more
/// dispatch to propagate, which is what the convergence driver and the seed
/// exchange loop rely on.
pub trait BlockDispatcher<T: Scalar>: Sync {
    /// Dispatch `op` over all blocks of `vol`; reports come back in block
    /// order, one per block (skipped blocks yield an empty report).
    fn dispatch(&self, vol: &mut Volume<T>, op: &dyn BlockOp<T>) -> DispatchResult<Vec<BlockReport>>;
}
