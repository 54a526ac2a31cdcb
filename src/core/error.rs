//! Error types for blockflow.
//!
//! Uses thiserror for structured errors with context. The taxonomy separates
//! configuration errors (caught before any block is dispatched), protocol
//! invariant violations (programming-logic errors, never user-recoverable),
//! dispatch failures, and per-block operation failures. Missing optional
//! seed files are deliberately *not* errors anywhere in this crate.

use crate::core::types::{ScalarType, Vec3};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for blockflow.
#[derive(Error, Debug)]
pub enum BlockflowError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("operation error: {0}")]
    Op(#[from] OpError),

    #[error("image source error: {0}")]
    Source(#[from] SourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors detected eagerly, before any block job is dispatched.
///
/// A configuration error aborts the whole operation with no partial work.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("block depth must be at least 1, got {depth}")]
    InvalidBlockDepth { depth: i64 },

    #[error("image dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: Vec3, got: Vec3 },

    #[error("pixel types of paired inputs must match: {left} vs {right}")]
    ScalarTypeMismatch { left: ScalarType, right: ScalarType },

    #[error("lower threshold {lower} exceeds upper threshold {upper}")]
    InvalidThresholds { lower: f64, upper: f64 },

    #[error("source and target colors must differ (both are {color})")]
    IdenticalColors { color: f64 },

    #[error("derivative sigma must be positive, got {sigma}")]
    InvalidSigma { sigma: f64 },

    #[error("unknown operation '{name}'")]
    UnknownOperation { name: String },
}

/// Protocol invariant violations.
///
/// These indicate a bug in the orchestration layer or an unsupported block
/// shape, not bad user input; they are fatal and never retried.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error(
        "block at {block_origin} has a boundary face whose normal is not the z axis; \
         seed exchange supports division along z only"
    )]
    UnsupportedFaceNormal { block_origin: Vec3 },

    #[error("{count} seed file(s) remain after the exchange loop terminated")]
    LeakedSeedFiles { count: usize },

    #[error("convergence loop exceeded the configured cap of {cap} iteration(s)")]
    IterationCapExceeded { cap: usize },
}

/// Failures while dispatching block jobs.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("block {block_index} failed: {error}")]
    BlockFailed {
        block_index: usize,
        #[source]
        error: OpError,
    },

    #[error("one block job needs {required} bytes but the memory budget is {limit}")]
    OutOfMemory { required: usize, limit: usize },

    #[error("I/O error during block staging: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure inside one block job.
///
/// Any error fails the whole block job; retry policy belongs to the executor.
#[derive(Error, Debug)]
pub enum OpError {
    #[error("seed file {path}: {source}")]
    SeedIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the image source lookup.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("image file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("file name of {path} does not encode dimensions (expected `name_WxHxD.raw`)")]
    NoDimensions { path: PathBuf },

    #[error(
        "file size of {path} is not a whole number of {expected}-pixel frames \
         ({len} bytes for {pixels} pixels)"
    )]
    SizeMismatch {
        path: PathBuf,
        len: u64,
        pixels: usize,
        expected: Vec3,
    },

    #[error("cannot infer pixel type from {bytes} bytes per pixel in {path}")]
    UnsupportedScalarSize { path: PathBuf, bytes: usize },

    #[error("{path} holds {actual} pixels but {requested} was requested")]
    WrongScalarType {
        path: PathBuf,
        actual: ScalarType,
        requested: ScalarType,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for blockflow operations.
pub type BlockflowResult<T> = Result<T, BlockflowError>;

/// Result type alias for block-job execution.
pub type OpResult<T> = Result<T, OpError>;

/// Result type alias for dispatch.
pub type DispatchResult<T> = Result<T, DispatchError>;
