//! Laplacian pyramid construction and collapse.
//!
//! The decomposition runs on a luminance plane: a Gaussian pyramid built by
//! repeated separable `[1,3,3,1]/8` low-pass downsampling, with each
//! band-pass level formed as `gaussian[j] - upsample(gaussian[j+1])` and the
//! coarsest Gaussian kept directly as the residual. Upsampling is separable
//! bilinear (`0.25 * f(x/2 - 1 + 2*(x%2)) + 0.75 * f(x/2)` per axis).
//!
//! Both directions clamp sample coordinates to the image border (replicate
//! edge). The same clamping is used in decompose and collapse so the
//! round trip is exact up to floating-point rounding: collapsing unmodified
//! bands reproduces the input plane.
//!
//! Level `j+1` has the floor-halved dimensions of level `j`. All planes and
//! scratch rows are allocated once for fixed frame dimensions; per-frame
//! work only rewrites them in place.

use ndarray::{Array2, Array3, Zip};

use super::utils::LUMA_WEIGHTS;
use super::Plane;

/// Floor-halved `(height, width)` per level for a given input size.
pub fn level_dims(width: usize, height: usize, levels: usize) -> Vec<(usize, usize)> {
    let mut dims = Vec::with_capacity(levels);
    let (mut w, mut h) = (width, height);
    for _ in 0..levels {
        dims.push((h, w));
        w /= 2;
        h /= 2;
    }
    dims
}

/// Weighted RGB sum into a luminance plane; single-channel input is copied.
pub fn luminance(frame: &Array3<f32>, out: &mut Plane) {
    let (h, w, c) = frame.dim();
    debug_assert_eq!(out.dim(), (h, w));
    if c == 1 {
        for y in 0..h {
            for x in 0..w {
                out[[y, x]] = frame[[y, x, 0]];
            }
        }
        return;
    }
    for y in 0..h {
        for x in 0..w {
            out[[y, x]] = LUMA_WEIGHTS[0] * frame[[y, x, 0]]
                + LUMA_WEIGHTS[1] * frame[[y, x, 1]]
                + LUMA_WEIGHTS[2] * frame[[y, x, 2]];
        }
    }
}

/// Horizontal `[1,3,3,1]/8` filter with 2x decimation, replicate border.
fn downsample_x(src: &Plane, dst: &mut Plane) {
    let (h, w) = src.dim();
    let (_, w2) = dst.dim();
    for y in 0..h {
        for x2 in 0..w2 {
            let x = 2 * x2;
            let a = src[[y, x.saturating_sub(1)]];
            let b = src[[y, x]];
            let c = src[[y, (x + 1).min(w - 1)]];
            let d = src[[y, (x + 2).min(w - 1)]];
            dst[[y, x2]] = (a + 3.0 * (b + c) + d) * 0.125;
        }
    }
}

/// Vertical pass of the same filter.
fn downsample_y(src: &Plane, dst: &mut Plane) {
    let (h, w2) = src.dim();
    let (h2, _) = dst.dim();
    for y2 in 0..h2 {
        let y = 2 * y2;
        let ym = y.saturating_sub(1);
        let yp1 = (y + 1).min(h - 1);
        let yp2 = (y + 2).min(h - 1);
        for x in 0..w2 {
            dst[[y2, x]] =
                (src[[ym, x]] + 3.0 * (src[[y, x]] + src[[yp1, x]]) + src[[yp2, x]]) * 0.125;
        }
    }
}

/// Horizontal bilinear upsample to the destination width, replicate border.
fn upsample_x(src: &Plane, dst: &mut Plane) {
    let (h, ws) = src.dim();
    let (_, wd) = dst.dim();
    for y in 0..h {
        for x in 0..wd {
            let base = (x / 2).min(ws - 1);
            let nb = if x % 2 == 0 {
                (x / 2).saturating_sub(1)
            } else {
                (x / 2 + 1).min(ws - 1)
            };
            dst[[y, x]] = 0.75 * src[[y, base]] + 0.25 * src[[y, nb]];
        }
    }
}

/// Vertical pass of the bilinear upsample.
fn upsample_y(src: &Plane, dst: &mut Plane) {
    let (hs, w) = src.dim();
    let (hd, _) = dst.dim();
    for y in 0..hd {
        let base = (y / 2).min(hs - 1);
        let nb = if y % 2 == 0 {
            (y / 2).saturating_sub(1)
        } else {
            (y / 2 + 1).min(hs - 1)
        };
        for x in 0..w {
            dst[[y, x]] = 0.75 * src[[base, x]] + 0.25 * src[[nb, x]];
        }
    }
}

/// Pyramid state for fixed frame dimensions: the Gaussian and band planes
/// plus the separable-pass scratch, all preallocated.
pub struct LaplacianPyramid {
    levels: usize,
    gauss: Vec<Plane>,
    band: Vec<Plane>,
    acc: Vec<Plane>,
    down_x: Vec<Plane>,
    up_x: Vec<Plane>,
    up: Vec<Plane>,
}

impl LaplacianPyramid {
    pub fn new(width: usize, height: usize, levels: usize) -> Self {
        let dims = level_dims(width, height, levels);
        let alloc = |d: &[(usize, usize)]| -> Vec<Plane> {
            d.iter().map(|&(h, w)| Array2::zeros((h, w))).collect()
        };
        // down_x[j]: horizontal result when producing level j+1 (full height
        // of level j, width of level j+1). up_x[j]: horizontal result when
        // expanding level j+1 back to level j (height of j+1, width of j).
        let down_x_dims: Vec<_> = (0..levels - 1).map(|j| (dims[j].0, dims[j + 1].1)).collect();
        let up_x_dims: Vec<_> = (0..levels - 1).map(|j| (dims[j + 1].0, dims[j].1)).collect();
        let up_dims: Vec<_> = dims[..levels - 1].to_vec();
        Self {
            levels,
            gauss: alloc(&dims),
            band: alloc(&dims),
            acc: alloc(&dims),
            down_x: alloc(&down_x_dims),
            up_x: alloc(&up_x_dims),
            up: alloc(&up_dims),
        }
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Band-pass planes of the last decomposition. Amplification rewrites
    /// these in place before `collapse`.
    pub fn bands(&self) -> &[Plane] {
        &self.band
    }

    pub fn bands_mut(&mut self) -> &mut [Plane] {
        &mut self.band
    }

    /// Build the Gaussian pyramid and derive the Laplacian bands.
    pub fn decompose(&mut self, luma: &Plane) {
        self.gauss[0].assign(luma);
        for j in 1..self.levels {
            downsample_x(&self.gauss[j - 1], &mut self.down_x[j - 1]);
            downsample_y(&self.down_x[j - 1], &mut self.gauss[j]);
        }
        for j in 0..self.levels - 1 {
            upsample_x(&self.gauss[j + 1], &mut self.up_x[j]);
            upsample_y(&self.up_x[j], &mut self.up[j]);
            Zip::from(&mut self.band[j])
                .and(&self.gauss[j])
                .and(&self.up[j])
                .for_each(|b, &g, &u| *b = g - u);
        }
        let last = self.levels - 1;
        self.band[last].assign(&self.gauss[last]);
    }

    /// Collapse the current bands coarsest to finest; returns the
    /// reconstructed luminance plane.
    pub fn collapse(&mut self) -> &Plane {
        let last = self.levels - 1;
        self.acc[last].assign(&self.band[last]);
        for j in (0..last).rev() {
            upsample_x(&self.acc[j + 1], &mut self.up_x[j]);
            upsample_y(&self.up_x[j], &mut self.up[j]);
            Zip::from(&mut self.acc[j])
                .and(&self.band[j])
                .and(&self.up[j])
                .for_each(|a, &b, &u| *a = b + u);
        }
        &self.acc[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic textured plane in [0,1].
    fn test_plane(h: usize, w: usize) -> Plane {
        Array2::from_shape_fn((h, w), |(y, x)| {
            let v = (x as f32 * 0.37).sin() * 0.25 + (y as f32 * 0.23).cos() * 0.25 + 0.5;
            v.clamp(0.0, 1.0)
        })
    }

    #[test]
    fn test_dimension_halving() {
        let dims = level_dims(96, 64, 5);
        assert_eq!(dims, vec![(64, 96), (32, 48), (16, 24), (8, 12), (4, 6)]);

        // Odd sizes floor-halve.
        let dims = level_dims(81, 63, 4);
        assert_eq!(dims, vec![(63, 81), (31, 40), (15, 20), (7, 10)]);
    }

    #[test]
    fn test_round_trip_is_exact() {
        let luma = test_plane(64, 96);
        let mut pyr = LaplacianPyramid::new(96, 64, 5);
        pyr.decompose(&luma);
        let out = pyr.collapse();
        let mut max_err = 0.0f32;
        for y in 0..64 {
            for x in 0..96 {
                max_err = max_err.max((out[[y, x]] - luma[[y, x]]).abs());
            }
        }
        assert!(max_err < 1e-4, "round-trip error {max_err}");
    }

    #[test]
    fn test_round_trip_odd_dimensions() {
        let luma = test_plane(63, 81);
        let mut pyr = LaplacianPyramid::new(81, 63, 4);
        pyr.decompose(&luma);
        let out = pyr.collapse();
        let mut max_err = 0.0f32;
        for y in 0..63 {
            for x in 0..81 {
                max_err = max_err.max((out[[y, x]] - luma[[y, x]]).abs());
            }
        }
        assert!(max_err < 1e-4, "round-trip error {max_err}");
    }

    #[test]
    fn test_band_dims_match_levels() {
        let mut pyr = LaplacianPyramid::new(96, 64, 5);
        pyr.decompose(&test_plane(64, 96));
        let dims = level_dims(96, 64, 5);
        for (band, &d) in pyr.bands().iter().zip(dims.iter()) {
            assert_eq!(band.dim(), d);
        }
    }

    #[test]
    fn test_luminance_weights() {
        let mut frame = Array3::zeros((2, 2, 3));
        frame[[0, 0, 0]] = 1.0;
        frame[[0, 1, 1]] = 1.0;
        frame[[1, 0, 2]] = 1.0;
        let mut luma = Array2::zeros((2, 2));
        luminance(&frame, &mut luma);
        assert!((luma[[0, 0]] - 0.299).abs() < 1e-6);
        assert!((luma[[0, 1]] - 0.587).abs() < 1e-6);
        assert!((luma[[1, 0]] - 0.114).abs() < 1e-6);
        assert_eq!(luma[[1, 1]], 0.0);
    }

    #[test]
    fn test_flat_plane_has_empty_bands() {
        // A constant plane is pure low-pass: every band-pass level is zero.
        let luma = Array2::from_elem((32, 32), 0.5);
        let mut pyr = LaplacianPyramid::new(32, 32, 4);
        pyr.decompose(&luma);
        for band in pyr.bands()[..3].iter() {
            for &v in band.iter() {
                assert!(v.abs() < 1e-5);
            }
        }
        for &v in pyr.bands()[3].iter() {
            assert!((v - 0.5).abs() < 1e-5);
        }
    }
}
