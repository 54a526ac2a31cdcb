//! Edge detection kernels: Gaussian-derivative gradient classification and
//! hysteresis edge tracking.

use crate::core::types::{Connectivity, Scalar, Vec3};
use crate::core::volume::Volume;

/// Class value of a pixel whose gradient magnitude cleared the upper threshold.
pub const STRONG_EDGE: f64 = 2.0;

/// Class value of a pixel between the two thresholds; kept only if edge
/// tracking connects it to a strong pixel.
pub const WEAK_EDGE: f64 = 1.0;

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil().max(1.0) as i64;
    let mut weights = Vec::with_capacity((2 * radius + 1) as usize);
    let denom = 2.0 * sigma * sigma;
    for i in -radius..=radius {
        weights.push((-((i * i) as f64) / denom).exp());
    }
    let sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

fn smooth_axis(data: &mut [f64], dims: Vec3, axis: usize, weights: &[f64]) {
    let (nx, ny, nz) = (dims.x as i64, dims.y as i64, dims.z as i64);
    let radius = (weights.len() as i64 - 1) / 2;
    let index = |x: i64, y: i64, z: i64| ((z * ny + y) * nx + x) as usize;
    let extent = [nx, ny, nz][axis];
    if extent <= 1 {
        return;
    }
    let src = data.to_vec();
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let mut acc = 0.0;
                for (k, w) in weights.iter().enumerate() {
                    let d = k as i64 - radius;
                    // Clamp at the block edge; the margin supplied by the
                    // dispatcher makes this exact inside the write region.
                    let (sx, sy, sz) = match axis {
                        0 => ((x + d).clamp(0, nx - 1), y, z),
                        1 => (x, (y + d).clamp(0, ny - 1), z),
                        _ => (x, y, (z + d).clamp(0, nz - 1)),
                    };
                    acc += w * src[index(sx, sy, sz)];
                }
                data[index(x, y, z)] = acc;
            }
        }
    }
}

/// Smooth with a Gaussian of scale `sigma`, take the central-difference
/// gradient magnitude, and classify against the two thresholds.
///
/// Pixels end up holding 0, [`WEAK_EDGE`] or [`STRONG_EDGE`]. The caller is
/// expected to follow with [`track_edges`] iterations and a final threshold.
pub fn gradient_classify<T: Scalar>(vol: &mut Volume<T>, sigma: f64, lower: f64, upper: f64) {
    let dims = vol.dims();
    let mut smooth: Vec<f64> = vol.data().iter().map(|v| v.to_f64()).collect();

    let weights = gaussian_kernel(sigma);
    for axis in 0..3 {
        smooth_axis(&mut smooth, dims, axis, &weights);
    }

    let (nx, ny, nz) = (dims.x, dims.y, dims.z);
    let index = |x: i64, y: i64, z: i64| ((z * ny + y) * nx + x) as usize;
    let strong = T::from_f64(STRONG_EDGE);
    let weak = T::from_f64(WEAK_EDGE);
    let zero = T::from_f64(0.0);

    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let diff = |a: i64, b: i64, n: i64, at: &dyn Fn(i64) -> f64| {
                    // Central difference, one-sided at the boundary.
                    let hi = at((b).min(n - 1));
                    let lo = at((a).max(0));
                    let span = (b.min(n - 1) - a.max(0)).max(1) as f64;
                    (hi - lo) / span
                };
                let gx = diff(x - 1, x + 1, nx, &|i| smooth[index(i, y, z)]);
                let gy = diff(y - 1, y + 1, ny, &|i| smooth[index(x, i, z)]);
                let gz = diff(z - 1, z + 1, nz, &|i| smooth[index(x, y, i)]);
                let mag = (gx * gx + gy * gy + gz * gz).sqrt();
                let p = Vec3::new(x, y, z);
                vol.set(
                    p,
                    if mag > upper {
                        strong
                    } else if mag > lower {
                        weak
                    } else {
                        zero
                    },
                );
            }
        }
    }
}

/// Promote weak pixels that touch a strong pixel (26-connected), repeating
/// until no promotion happens inside this block.
///
/// Returns the number of pixels promoted. Changes that must cross a block
/// boundary are picked up by the next convergence iteration, which re-runs
/// this kernel with refreshed margins.
pub fn track_edges<T: Scalar>(vol: &mut Volume<T>) -> usize {
    let strong = T::from_f64(STRONG_EDGE);
    let weak = T::from_f64(WEAK_EDGE);
    let dims = vol.dims();

    let mut stack = Vec::new();
    for z in 0..dims.z {
        for y in 0..dims.y {
            for x in 0..dims.x {
                let p = Vec3::new(x, y, z);
                if vol.get(p) == strong {
                    stack.push(p);
                }
            }
        }
    }

    let mut changed = 0;
    while let Some(p) = stack.pop() {
        for off in Connectivity::All.offsets() {
            let q = p + *off;
            if vol.try_get(q) == Some(weak) {
                vol.set(q, strong);
                changed += 1;
                stack.push(q);
            }
        }
    }
    changed
}
