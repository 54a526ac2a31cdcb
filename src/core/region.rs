//! Block geometry: axis-aligned regions and read/write region computation.
//!
//! A distributable operation declares a per-axis margin; the region it must
//! *read* is its output region expanded by that margin and clipped to the
//! image bounds, while the region it *writes* is the output region unchanged.
//! Clipping may leave less than the requested margin at image edges, so
//! operations must never assume the full margin is present.

use crate::core::types::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An axis-aligned box: origin plus size, in global image coordinates
/// unless explicitly stated block-local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Minimum corner.
    pub origin: Vec3,
    /// Extent along each axis.
    pub size: Vec3,
}

impl Region {
    /// Create a new region.
    pub const fn new(origin: Vec3, size: Vec3) -> Self {
        Self { origin, size }
    }

    /// Region covering a whole image of the given dimensions.
    pub const fn full(dims: Vec3) -> Self {
        Self {
            origin: Vec3::ZERO,
            size: dims,
        }
    }

    /// Exclusive maximum corner.
    pub fn end(&self) -> Vec3 {
        self.origin + self.size
    }

    /// Number of pixels covered.
    pub fn pixel_count(&self) -> usize {
        self.size.pixel_count()
    }

    /// True if any axis has non-positive extent.
    pub fn is_empty(&self) -> bool {
        self.size.x <= 0 || self.size.y <= 0 || self.size.z <= 0
    }

    /// True if the point lies inside this region.
    pub fn contains_point(&self, p: Vec3) -> bool {
        let end = self.end();
        p.x >= self.origin.x
            && p.y >= self.origin.y
            && p.z >= self.origin.z
            && p.x < end.x
            && p.y < end.y
            && p.z < end.z
    }

    /// True if `other` lies entirely inside this region.
    pub fn contains(&self, other: &Region) -> bool {
        if other.is_empty() {
            return true;
        }
        let end = self.end();
        let oend = other.end();
        other.origin.x >= self.origin.x
            && other.origin.y >= self.origin.y
            && other.origin.z >= self.origin.z
            && oend.x <= end.x
            && oend.y <= end.y
            && oend.z <= end.z
    }

    /// Grow the region symmetrically by `margin` on every axis.
    ///
    /// The result may extend outside the image; pair with [`Region::clip_to`].
    pub fn expand(&self, margin: Vec3) -> Region {
        Region::new(self.origin - margin, self.size + margin + margin)
    }

    /// Clip to an image of the given dimensions.
    ///
    /// The result has non-negative origin and `origin + size <= dims` on
    /// every axis; a region entirely outside the image collapses to empty.
    pub fn clip_to(&self, dims: Vec3) -> Region {
        let origin = self.origin.max(Vec3::ZERO).min(dims);
        let end = self.end().min(dims).max(origin);
        Region::new(origin, end - origin)
    }

    /// Translate so that `origin` becomes the new coordinate origin.
    ///
    /// Converts a global region into block-local coordinates.
    pub fn local_to(&self, origin: Vec3) -> Region {
        Region::new(self.origin - origin, self.size)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}", self.origin, self.size)
    }
}

/// Compute the read and write regions for one block job.
///
/// `write = output` unchanged; `read = clip(expand(output, margin), dims)`.
/// Pure function, no error conditions.
pub fn compute_regions(output: Region, margin: Vec3, dims: Vec3) -> (Region, Region) {
    let read = output.expand(margin).clip_to(dims);
    (read, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_end_and_contains() {
        let r = Region::new(Vec3::new(1, 2, 3), Vec3::new(10, 10, 10));
        assert_eq!(r.end(), Vec3::new(11, 12, 13));
        assert!(r.contains_point(Vec3::new(1, 2, 3)));
        assert!(r.contains_point(Vec3::new(10, 11, 12)));
        assert!(!r.contains_point(Vec3::new(11, 12, 13)));
    }

    #[test]
    fn test_clip_interior_is_identity() {
        let dims = Vec3::splat(100);
        let r = Region::new(Vec3::new(10, 20, 30), Vec3::new(5, 5, 5));
        assert_eq!(r.clip_to(dims), r);
    }

    #[test]
    fn test_clip_at_edges() {
        let dims = Vec3::splat(50);
        let r = Region::new(Vec3::new(-5, 45, 0), Vec3::new(20, 20, 50));
        let clipped = r.clip_to(dims);
        assert_eq!(clipped.origin, Vec3::new(0, 45, 0));
        assert_eq!(clipped.size, Vec3::new(15, 5, 50));
    }

    #[test]
    fn test_clip_fully_outside() {
        let dims = Vec3::splat(10);
        let r = Region::new(Vec3::new(20, 20, 20), Vec3::new(5, 5, 5));
        assert!(r.clip_to(dims).is_empty());
    }

    #[test]
    fn test_compute_regions_interior() {
        let dims = Vec3::splat(100);
        let out = Region::new(Vec3::new(10, 10, 10), Vec3::new(20, 20, 20));
        let (read, write) = compute_regions(out, Vec3::splat(3), dims);
        assert_eq!(write, out);
        assert_eq!(read.origin, Vec3::new(7, 7, 7));
        assert_eq!(read.size, Vec3::new(26, 26, 26));
    }

    #[test]
    fn test_compute_regions_clipped_margin() {
        let dims = Vec3::new(30, 30, 30);
        let out = Region::new(Vec3::ZERO, Vec3::new(30, 30, 10));
        let (read, write) = compute_regions(out, Vec3::splat(4), dims);
        assert_eq!(write, out);
        // Margin only extends where the image does.
        assert_eq!(read.origin, Vec3::ZERO);
        assert_eq!(read.size, Vec3::new(30, 30, 14));
    }

    fn arb_region() -> impl Strategy<Value = Region> {
        (0i64..40, 0i64..40, 0i64..40, 1i64..20, 1i64..20, 1i64..20).prop_map(
            |(x, y, z, w, h, d)| Region::new(Vec3::new(x, y, z), Vec3::new(w, h, d)),
        )
    }

    proptest! {
        /// Read region always contains the write region and stays in bounds;
        /// it equals the raw expansion whenever that expansion fits.
        #[test]
        fn prop_read_contains_write(out in arb_region(), m in 0i64..8) {
            let dims = Vec3::splat(48);
            let out = out.clip_to(dims);
            prop_assume!(!out.is_empty());

            let (read, write) = compute_regions(out, Vec3::splat(m), dims);
            prop_assert!(read.contains(&write));
            prop_assert!(Region::full(dims).contains(&read));

            let unclipped = out.expand(Vec3::splat(m));
            if Region::full(dims).contains(&unclipped) {
                prop_assert_eq!(read, unclipped);
            }
        }

        /// A larger margin never yields a smaller read region.
        #[test]
        fn prop_margin_monotonic(out in arb_region(), m in 0i64..8) {
            let dims = Vec3::splat(48);
            let out = out.clip_to(dims);
            prop_assume!(!out.is_empty());

            let (small, _) = compute_regions(out, Vec3::splat(m), dims);
            let (large, _) = compute_regions(out, Vec3::splat(m + 1), dims);
            prop_assert!(large.contains(&small));
        }
    }
}
