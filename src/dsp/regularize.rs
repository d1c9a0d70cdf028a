//! Amplitude-weighted spatial regularization of the phase change.
//!
//! Phase estimates are meaningless where the band has no energy: flat
//! regions divide near-zero by near-zero upstream and come out noisy. The
//! regularizer blurs each change channel weighted by local amplitude and
//! renormalizes by the blurred amplitude:
//!
//! ```text
//! changeReg = blur(change * amp) / blur(amp)
//! ```
//!
//! so strong-amplitude neighbors dominate weak ones without any hard
//! threshold. The denominator has an absolute floor: a neighborhood whose
//! amplitude is uniformly near zero is suppressed toward zero rather than
//! renormalized, which is what keeps noise-dominated regions quiet.
//!
//! The blur is a separable Gaussian whose sigma is configured per level,
//! larger at coarser levels. With stabilization enabled the weight is the
//! current amplitude damped to the calibrated reference, trading
//! responsiveness for stability where the scene deviates from calibration.

use ndarray::Zip;

use super::utils::{AMP_FLOOR, EPS};
use super::Plane;

/// Normalized 1D Gaussian taps, radius `ceil(3 sigma)`, built once per
/// level at configuration time.
#[derive(Debug, Clone)]
pub struct GaussianKernel {
    taps: Vec<f32>,
    radius: usize,
}

impl GaussianKernel {
    pub fn new(sigma: f32) -> Self {
        let sigma = sigma.max(0.1);
        let radius = (3.0 * sigma).ceil().max(1.0) as usize;
        let mut taps = Vec::with_capacity(2 * radius + 1);
        let inv = 1.0 / (2.0 * sigma * sigma);
        let mut sum = 0.0f32;
        for i in 0..=2 * radius {
            let d = i as f32 - radius as f32;
            let t = (-d * d * inv).exp();
            sum += t;
            taps.push(t);
        }
        for t in taps.iter_mut() {
            *t /= sum;
        }
        Self { taps, radius }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }
}

/// Separable Gaussian blur with replicate borders: horizontal pass into
/// `tmp`, vertical pass into `dst`.
pub fn blur(src: &Plane, kernel: &GaussianKernel, tmp: &mut Plane, dst: &mut Plane) {
    let (h, w) = src.dim();
    let r = kernel.radius as isize;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (i, &t) in kernel.taps.iter().enumerate() {
                let sx = (x as isize + i as isize - r).clamp(0, w as isize - 1) as usize;
                acc += t * src[[y, sx]];
            }
            tmp[[y, x]] = acc;
        }
    }
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (i, &t) in kernel.taps.iter().enumerate() {
                let sy = (y as isize + i as isize - r).clamp(0, h as isize - 1) as usize;
                acc += t * tmp[[sy, x]];
            }
            dst[[y, x]] = acc;
        }
    }
}

/// Local analytic-signal amplitude `sqrt(band^2 + r1^2 + r2^2)`, floored.
pub fn amplitude(band: &Plane, r1: &Plane, r2: &Plane, out: &mut Plane) {
    Zip::from(out)
        .and(band)
        .and(r1)
        .and(r2)
        .for_each(|a, &b, &q1, &q2| {
            *a = (b * b + q1 * q1 + q2 * q2).sqrt().max(EPS);
        });
}

/// Weight for stabilized mode: current amplitude damped to the calibrated
/// baseline, so regions running hotter than calibration lose influence.
pub fn stabilized_weight(amp: &Plane, reference: &Plane, out: &mut Plane) {
    Zip::from(out)
        .and(amp)
        .and(reference)
        .for_each(|w, &a, &r| *w = a.min(r));
}

/// Regularize both change channels against a shared weight plane. The
/// blurred denominator is computed once; `prod`, `tmp`, `num`, `den` are
/// preallocated scratch.
#[allow(clippy::too_many_arguments)]
pub fn regularize(
    change_c: &Plane,
    change_s: &Plane,
    weight: &Plane,
    kernel: &GaussianKernel,
    prod: &mut Plane,
    tmp: &mut Plane,
    num: &mut Plane,
    den: &mut Plane,
    out_c: &mut Plane,
    out_s: &mut Plane,
) {
    blur(weight, kernel, tmp, den);

    Zip::from(&mut *prod)
        .and(change_c)
        .and(weight)
        .for_each(|p, &c, &w| *p = c * w);
    blur(prod, kernel, tmp, num);
    Zip::from(out_c)
        .and(&*num)
        .and(&*den)
        .for_each(|o, &n, &d| *o = n / d.max(AMP_FLOOR));

    Zip::from(&mut *prod)
        .and(change_s)
        .and(weight)
        .for_each(|p, &c, &w| *p = c * w);
    blur(prod, kernel, tmp, num);
    Zip::from(out_s)
        .and(&*num)
        .and(&*den)
        .for_each(|o, &n, &d| *o = n / d.max(AMP_FLOOR));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_kernel_is_normalized() {
        for sigma in [0.5, 1.0, 2.5, 5.0] {
            let k = GaussianKernel::new(sigma);
            let sum: f32 = k.taps.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            assert_eq!(k.taps.len(), 2 * k.radius() + 1);
        }
    }

    #[test]
    fn test_blur_preserves_constant() {
        let src = Array2::from_elem((12, 12), 0.6);
        let k = GaussianKernel::new(1.5);
        let mut tmp = Array2::zeros((12, 12));
        let mut dst = Array2::zeros((12, 12));
        blur(&src, &k, &mut tmp, &mut dst);
        for &v in dst.iter() {
            assert!((v - 0.6).abs() < 1e-5);
        }
    }

    #[test]
    fn test_amplitude_floor() {
        let z = Array2::zeros((4, 4));
        let mut amp = Array2::zeros((4, 4));
        amplitude(&z, &z, &z, &mut amp);
        assert_eq!(amp[[0, 0]], EPS);
    }

    #[test]
    fn test_dead_region_is_suppressed() {
        // Uniformly epsilon-floored amplitude with a large raw change: the
        // output must approach zero no matter what the change says.
        let (h, w) = (16, 16);
        let change = Array2::from_elem((h, w), 1.0);
        let weight = Array2::from_elem((h, w), EPS);
        let k = GaussianKernel::new(1.0);
        let mut prod = Array2::zeros((h, w));
        let mut tmp = Array2::zeros((h, w));
        let mut num = Array2::zeros((h, w));
        let mut den = Array2::zeros((h, w));
        let mut out_c = Array2::zeros((h, w));
        let mut out_s = Array2::zeros((h, w));
        regularize(
            &change, &change, &weight, &k, &mut prod, &mut tmp, &mut num, &mut den, &mut out_c,
            &mut out_s,
        );
        for &v in out_c.iter() {
            assert!(v.abs() < 1e-2, "dead region leaked {v}");
        }
    }

    #[test]
    fn test_strong_region_passes_change() {
        let (h, w) = (16, 16);
        let change = Array2::from_elem((h, w), 0.3);
        let weight = Array2::from_elem((h, w), 1.0);
        let k = GaussianKernel::new(1.0);
        let mut prod = Array2::zeros((h, w));
        let mut tmp = Array2::zeros((h, w));
        let mut num = Array2::zeros((h, w));
        let mut den = Array2::zeros((h, w));
        let mut out_c = Array2::zeros((h, w));
        let mut out_s = Array2::zeros((h, w));
        regularize(
            &change, &change, &weight, &k, &mut prod, &mut tmp, &mut num, &mut den, &mut out_c,
            &mut out_s,
        );
        assert!((out_c[[8, 8]] - 0.3).abs() < 1e-4);
        assert!((out_s[[8, 8]] - 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_stabilized_weight_damps_to_reference() {
        let amp = Array2::from_elem((4, 4), 0.8);
        let mut reference = Array2::from_elem((4, 4), 0.2);
        reference[[0, 0]] = 1.0;
        let mut w = Array2::zeros((4, 4));
        stabilized_weight(&amp, &reference, &mut w);
        assert_eq!(w[[0, 0]], 0.8);
        assert_eq!(w[[1, 1]], 0.2);
    }
}
