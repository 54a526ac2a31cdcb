//! Single-block numeric kernels.
//!
//! The orchestration layer treats these as opaque: each kernel receives an
//! already-materialized block buffer and returns mutated pixels plus, where
//! relevant, a changed-pixel count. Nothing here knows about blocks, margins
//! or seed files.

mod edge;
mod fill;

pub use edge::{gradient_classify, track_edges, STRONG_EDGE, WEAK_EDGE};
pub use fill::{flood_fill, grow};

use crate::core::types::Scalar;
use crate::core::volume::Volume;

/// Set pixels above `threshold` to 1 and all others to 0.
pub fn threshold<T: Scalar>(vol: &mut Volume<T>, threshold: f64) {
    let one = T::from_f64(1.0);
    let zero = T::from_f64(0.0);
    for v in vol.data_mut() {
        *v = if v.to_f64() > threshold { one } else { zero };
    }
}

/// Classify pixels into three classes by two thresholds.
///
/// Above `upper` becomes 2 ("sure"), above `lower` becomes 1 ("maybe"),
/// the rest becomes 0.
pub fn double_threshold<T: Scalar>(vol: &mut Volume<T>, lower: f64, upper: f64) {
    let two = T::from_f64(2.0);
    let one = T::from_f64(1.0);
    let zero = T::from_f64(0.0);
    for v in vol.data_mut() {
        let x = v.to_f64();
        *v = if x > upper {
            two
        } else if x > lower {
            one
        } else {
            zero
        };
    }
}
