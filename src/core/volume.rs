//! In-memory 3-D scalar image with block extraction and write-back.
//!
//! `Volume` is the buffer a block job materializes: the caller holds the full
//! image, each dispatched job receives a temporary block-local sub-volume for
//! the duration of its run. Layout is x-fastest, then y, then z.

use crate::core::region::Region;
use crate::core::types::{Coord, Scalar, Vec3};

/// A dense 3-D image of one scalar type.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    dims: Vec3,
    data: Vec<T>,
}

impl<T: Scalar> Volume<T> {
    /// Create a volume filled with the scalar default.
    ///
    /// # Panics
    /// Panics if any dimension is negative.
    pub fn new(dims: Vec3) -> Self {
        Self::filled(dims, T::default())
    }

    /// Create a volume filled with a constant value.
    ///
    /// # Panics
    /// Panics if any dimension is negative.
    pub fn filled(dims: Vec3, value: T) -> Self {
        assert!(dims.is_non_negative(), "volume dimensions must be non-negative: {}", dims);
        Self {
            dims,
            data: vec![value; dims.pixel_count()],
        }
    }

    /// Build a volume from an existing flat buffer (x-fastest layout).
    ///
    /// # Panics
    /// Panics if the buffer length does not match the dimensions.
    pub fn from_data(dims: Vec3, data: Vec<T>) -> Self {
        assert!(dims.is_non_negative(), "volume dimensions must be non-negative: {}", dims);
        assert_eq!(data.len(), dims.pixel_count(), "buffer length does not match dimensions");
        Self { dims, data }
    }

    /// Image dimensions.
    pub fn dims(&self) -> Vec3 {
        self.dims
    }

    /// Extent along x.
    pub fn width(&self) -> Coord {
        self.dims.x
    }

    /// Extent along y.
    pub fn height(&self) -> Coord {
        self.dims.y
    }

    /// Extent along z.
    pub fn depth(&self) -> Coord {
        self.dims.z
    }

    /// Total pixel count.
    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }

    /// Size of the pixel buffer in bytes.
    pub fn byte_count(&self) -> usize {
        self.data.len() * T::BYTES
    }

    /// True if the point lies inside the image.
    pub fn in_bounds(&self, p: Vec3) -> bool {
        p.x >= 0 && p.y >= 0 && p.z >= 0 && p.x < self.dims.x && p.y < self.dims.y && p.z < self.dims.z
    }

    fn index(&self, p: Vec3) -> usize {
        debug_assert!(self.in_bounds(p), "point {} outside volume {}", p, self.dims);
        (p.z as usize * self.dims.y as usize + p.y as usize) * self.dims.x as usize
            + p.x as usize
    }

    /// Read one pixel.
    ///
    /// # Panics
    /// Panics if the point is out of bounds.
    pub fn get(&self, p: Vec3) -> T {
        self.data[self.index(p)]
    }

    /// Write one pixel.
    ///
    /// # Panics
    /// Panics if the point is out of bounds.
    pub fn set(&mut self, p: Vec3, value: T) {
        let i = self.index(p);
        self.data[i] = value;
    }

    /// Read one pixel, or `None` when out of bounds.
    pub fn try_get(&self, p: Vec3) -> Option<T> {
        if self.in_bounds(p) {
            Some(self.data[self.index(p)])
        } else {
            None
        }
    }

    /// Borrow the flat pixel buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutably borrow the flat pixel buffer.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Copy out a sub-volume.
    ///
    /// # Panics
    /// Panics if the region does not lie entirely inside this volume.
    pub fn extract(&self, region: Region) -> Volume<T> {
        assert!(
            Region::full(self.dims).contains(&region),
            "extract region {} outside volume {}",
            region,
            self.dims
        );
        let mut out = Volume::new(region.size);
        for z in 0..region.size.z {
            for y in 0..region.size.y {
                let src = self.index(region.origin + Vec3::new(0, y, z));
                let dst = out.index(Vec3::new(0, y, z));
                let w = region.size.x as usize;
                out.data[dst..dst + w].copy_from_slice(&self.data[src..src + w]);
            }
        }
        out
    }

    /// Copy `src_region` of `src` into this volume at `dst_origin`.
    ///
    /// # Panics
    /// Panics if either side of the copy is out of bounds.
    pub fn paste(&mut self, src: &Volume<T>, src_region: Region, dst_origin: Vec3) {
        assert!(
            Region::full(src.dims).contains(&src_region),
            "paste source region {} outside volume {}",
            src_region,
            src.dims
        );
        let dst_region = Region::new(dst_origin, src_region.size);
        assert!(
            Region::full(self.dims).contains(&dst_region),
            "paste destination region {} outside volume {}",
            dst_region,
            self.dims
        );
        for z in 0..src_region.size.z {
            for y in 0..src_region.size.y {
                let s = src.index(src_region.origin + Vec3::new(0, y, z));
                let d = self.index(dst_origin + Vec3::new(0, y, z));
                let w = src_region.size.x as usize;
                self.data[d..d + w].copy_from_slice(&src.data[s..s + w]);
            }
        }
    }

    /// Snapshot one z plane, rows in y order, x-fastest.
    pub fn z_plane(&self, z: Coord) -> Vec<T> {
        let mut out = Vec::with_capacity((self.dims.x * self.dims.y).max(0) as usize);
        for y in 0..self.dims.y {
            let start = self.index(Vec3::new(0, y, z));
            out.extend_from_slice(&self.data[start..start + self.dims.x as usize]);
        }
        out
    }

    /// Snapshot the pixel values of a region, z then y then x order.
    pub fn region_snapshot(&self, region: Region) -> Vec<T> {
        let mut out = Vec::with_capacity(region.pixel_count());
        for z in 0..region.size.z {
            for y in 0..region.size.y {
                let start = self.index(region.origin + Vec3::new(0, y, z));
                out.extend_from_slice(&self.data[start..start + region.size.x as usize]);
            }
        }
        out
    }

    /// Count pixels inside `region` that differ from a prior snapshot.
    pub fn count_region_diff(&self, region: Region, snapshot: &[T]) -> usize {
        debug_assert_eq!(snapshot.len(), region.pixel_count());
        let mut changed = 0;
        let mut n = 0;
        for z in 0..region.size.z {
            for y in 0..region.size.y {
                let start = self.index(region.origin + Vec3::new(0, y, z));
                for v in &self.data[start..start + region.size.x as usize] {
                    if *v != snapshot[n] {
                        changed += 1;
                    }
                    n += 1;
                }
            }
        }
        changed
    }

    /// Count pixels equal to `value`.
    pub fn count_value(&self, value: T) -> usize {
        self.data.iter().filter(|v| **v == value).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(dims: Vec3) -> Volume<u16> {
        let mut v = Volume::new(dims);
        for z in 0..dims.z {
            for y in 0..dims.y {
                for x in 0..dims.x {
                    v.set(Vec3::new(x, y, z), (x + 10 * y + 100 * z) as u16);
                }
            }
        }
        v
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut v: Volume<u8> = Volume::new(Vec3::new(4, 3, 2));
        let p = Vec3::new(3, 2, 1);
        assert_eq!(v.get(p), 0);
        v.set(p, 7);
        assert_eq!(v.get(p), 7);
        assert_eq!(v.try_get(Vec3::new(4, 0, 0)), None);
    }

    #[test]
    fn test_extract_paste_roundtrip() {
        let v = ramp(Vec3::new(6, 5, 4));
        let region = Region::new(Vec3::new(1, 2, 1), Vec3::new(3, 2, 2));
        let block = v.extract(region);
        assert_eq!(block.dims(), region.size);
        assert_eq!(block.get(Vec3::ZERO), v.get(region.origin));

        let mut out: Volume<u16> = Volume::new(v.dims());
        out.paste(&block, Region::full(block.dims()), region.origin);
        for z in 0..region.size.z {
            for y in 0..region.size.y {
                for x in 0..region.size.x {
                    let p = region.origin + Vec3::new(x, y, z);
                    assert_eq!(out.get(p), v.get(p));
                }
            }
        }
    }

    #[test]
    fn test_paste_confined_to_region() {
        let mut dst: Volume<u8> = Volume::new(Vec3::splat(4));
        let src: Volume<u8> = Volume::filled(Vec3::splat(4), 9);
        // Only the inner 2x2x2 core is pasted.
        dst.paste(&src, Region::new(Vec3::splat(1), Vec3::splat(2)), Vec3::splat(1));
        assert_eq!(dst.count_value(9), 8);
        assert_eq!(dst.get(Vec3::ZERO), 0);
    }

    #[test]
    fn test_z_plane_order() {
        let v = ramp(Vec3::new(3, 2, 2));
        let plane = v.z_plane(1);
        assert_eq!(plane.len(), 6);
        assert_eq!(plane[0], v.get(Vec3::new(0, 0, 1)));
        assert_eq!(plane[3], v.get(Vec3::new(0, 1, 1)));
        assert_eq!(plane[5], v.get(Vec3::new(2, 1, 1)));
    }

    #[test]
    fn test_region_diff() {
        let mut v = ramp(Vec3::new(4, 4, 4));
        let region = Region::new(Vec3::new(1, 1, 1), Vec3::splat(2));
        let snap = v.region_snapshot(region);
        assert_eq!(v.count_region_diff(region, &snap), 0);
        v.set(Vec3::new(1, 2, 1), 999);
        v.set(Vec3::new(0, 0, 0), 998); // outside the region, not counted
        assert_eq!(v.count_region_diff(region, &snap), 1);
    }
}
