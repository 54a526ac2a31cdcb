//! Flood fill and region growing on a single block.

use crate::core::types::{Connectivity, Scalar, Vec3};
use crate::core::volume::Volume;

/// Flood fill from a list of seed points.
///
/// Every seed whose pixel currently holds `original` starts a fill; the fill
/// proceeds through `original`-colored neighbors under the given
/// connectivity, painting them `fill`. Seeds outside the volume or on pixels
/// of any other color are ignored, which lets callers pass speculative seeds
/// (the cross-block 3x3 footprint may reach outside the block).
///
/// Returns the number of pixels painted.
pub fn flood_fill<T: Scalar>(
    vol: &mut Volume<T>,
    seeds: &[Vec3],
    original: T,
    fill: T,
    connectivity: Connectivity,
) -> usize {
    if original == fill {
        // Nothing distinguishes filled from unfilled pixels; filling would
        // revisit pixels forever.
        return 0;
    }

    let mut stack: Vec<Vec3> = seeds
        .iter()
        .copied()
        .filter(|p| vol.try_get(*p) == Some(original))
        .collect();

    let mut changed = 0;
    while let Some(p) = stack.pop() {
        if vol.get(p) != original {
            continue; // already painted via another path
        }
        vol.set(p, fill);
        changed += 1;
        for off in connectivity.offsets() {
            let q = p + *off;
            if vol.try_get(q) == Some(original) {
                stack.push(q);
            }
        }
    }
    changed
}

/// Grow `source`-colored regions into `target`-colored pixels.
///
/// Every pixel already holding `source` acts as a seed; any reachable
/// `target` pixel is repainted `source`. Returns the number of pixels
/// repainted.
pub fn grow<T: Scalar>(vol: &mut Volume<T>, source: T, target: T, connectivity: Connectivity) -> usize {
    if source == target {
        return 0;
    }

    let dims = vol.dims();
    let mut stack = Vec::new();
    for z in 0..dims.z {
        for y in 0..dims.y {
            for x in 0..dims.x {
                let p = Vec3::new(x, y, z);
                if vol.get(p) == source {
                    stack.push(p);
                }
            }
        }
    }

    let mut changed = 0;
    while let Some(p) = stack.pop() {
        for off in connectivity.offsets() {
            let q = p + *off;
            if vol.try_get(q) == Some(target) {
                vol.set(q, source);
                changed += 1;
                stack.push(q);
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flood_fill_whole_volume() {
        let mut v: Volume<u8> = Volume::filled(Vec3::splat(4), 7);
        let changed = flood_fill(&mut v, &[Vec3::ZERO], 7, 9, Connectivity::Nearest);
        assert_eq!(changed, 64);
        assert_eq!(v.count_value(9), 64);
    }

    #[test]
    fn test_flood_fill_respects_barrier() {
        // A z=1 wall of 0s splits the volume in two under 6-connectivity.
        let mut v: Volume<u8> = Volume::filled(Vec3::new(3, 3, 3), 7);
        for y in 0..3 {
            for x in 0..3 {
                v.set(Vec3::new(x, y, 1), 0);
            }
        }
        let changed = flood_fill(&mut v, &[Vec3::ZERO], 7, 9, Connectivity::Nearest);
        assert_eq!(changed, 9);
        assert_eq!(v.get(Vec3::new(0, 0, 2)), 7);
    }

    #[test]
    fn test_flood_fill_skips_bad_seeds() {
        let mut v: Volume<u8> = Volume::filled(Vec3::splat(2), 5);
        // Out-of-bounds and wrong-color seeds are ignored.
        let changed = flood_fill(
            &mut v,
            &[Vec3::new(-1, 0, 0), Vec3::new(9, 9, 9)],
            7,
            9,
            Connectivity::All,
        );
        assert_eq!(changed, 0);
    }

    #[test]
    fn test_flood_fill_same_colors_is_noop() {
        let mut v: Volume<u8> = Volume::filled(Vec3::splat(2), 5);
        assert_eq!(flood_fill(&mut v, &[Vec3::ZERO], 5, 5, Connectivity::All), 0);
    }

    #[test]
    fn test_grow_fills_connected_target() {
        // source=2 at one end, target=1 everywhere else, background 0 wall.
        let mut v = Volume::from_data(Vec3::new(5, 1, 1), vec![2u8, 1, 1, 0, 1]);
        let changed = grow(&mut v, 2, 1, Connectivity::Nearest);
        assert_eq!(changed, 2);
        assert_eq!(v.data(), &[2, 2, 2, 0, 1]);
    }
}
