//! # Blockflow - Out-of-core Block Orchestration for 3-D Images
//!
//! Blockflow runs image operations over volumes too large to treat as one
//! buffer by dividing them into z slabs, dispatching each slab as an
//! independent block job, and re-dispatching until cross-block effects have
//! propagated.
//!
//! ## Features
//!
//! - **Block geometry**: per-operation read margins, clipped at image edges
//! - **Distributable operations**: the [`BlockOp`] trait plus built-in
//!   grow, threshold and edge-detection operations
//! - **Convergence driving**: counted operations re-run until a full round
//!   reports zero changed pixels
//! - **Seed exchange**: distributed flood fill that crosses block boundaries
//!   through durable seed files instead of shared memory
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use blockflow::prelude::*;
//!
//! let mut vol: Volume<u8> = read_volume("scan_256x256x129.raw".as_ref())?;
//! let exec = LocalExecutor::new(32)?;
//!
//! // Fill the connected component containing (10, 10, 10) with 255.
//! let outcome = FloodFill::new(Vec3::new(10, 10, 10), 255.0)
//!     .connectivity(Connectivity::All)
//!     .run(&exec, &mut vol)?;
//! println!("{} pixels in {} rounds", outcome.pixels_filled, outcome.iterations);
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: coordinates, regions, volumes, scalar types and errors
//! - [`kernels`]: single-block numeric kernels, unaware of blocking
//! - [`ops`]: the [`BlockOp`] contract, built-in operations and the registry
//! - [`dispatch`]: executors and the convergence driver
//! - [`seeds`]: the seed-file protocol behind distributed flood fill
//! - [`source`]: raw-file image reading and writing
//!
//! [`BlockOp`]: crate::ops::BlockOp

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod dispatch;
pub mod kernels;
pub mod ops;
pub mod seeds;
pub mod source;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use blockflow::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::region::{compute_regions, Region};
    pub use crate::core::types::{Connectivity, Coord, Scalar, ScalarType, Vec3};
    pub use crate::core::volume::Volume;

    // Errors
    pub use crate::core::error::{
        BlockflowError, BlockflowResult, ConfigError, DispatchError, DispatchResult, OpError,
        OpResult, ProtocolError, SourceError,
    };

    // Operations
    pub use crate::ops::{
        detect_edges, dual_threshold, BlockContext, BlockOp, BlockReport, DoubleThresholdOp,
        EdgeTrackOp, FillOutcome, FloodFill, FloodFillBlockOp, GradientOp, GrowOp, JobType,
        OpParams, OpRegistry, ThresholdOp, PIXELS_CHANGED,
    };

    // Dispatch
    pub use crate::dispatch::{
        BlockDispatcher, ConvergenceDriver, ConvergenceOutcome, LocalExecutor, ProgressCallback,
        ProgressLog, ProgressUpdate,
    };

    // Seed files
    pub use crate::seeds::SeedPrefixes;

    // Sources
    pub use crate::source::{check_matching_pair, read_volume, volume_info, write_volume, VolumeInfo};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
