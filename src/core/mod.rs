//! Core types: vectors, regions, volumes and errors.

pub mod error;
pub mod region;
pub mod types;
pub mod volume;

pub use error::{BlockflowError, BlockflowResult, ConfigError, DispatchError, OpError, ProtocolError, SourceError};
pub use region::{compute_regions, Region};
pub use types::{Connectivity, Coord, Scalar, ScalarType, Vec3};
pub use volume::Volume;
