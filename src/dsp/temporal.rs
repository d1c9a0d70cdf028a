//! Temporal band-pass over the accumulated phase signal.
//!
//! A fixed-coefficient second-order IIR, applied identically and
//! independently to the cosine and sine phase channels of every level. The
//! first stage runs the recurrence
//!
//! ```text
//! lowpass1[t] = b0*x[t] + b1*x[t-1] + b2*x[t-2]
//!               - a1*lowpass1[t-1] - a2*lowpass1[t-2]
//! ```
//!
//! on the phase input; the second stage runs the same recurrence cascaded
//! on `lowpass1`, and the band-pass output is the stage difference
//! `change = lowpass1 - lowpass2`. With low-pass coefficients the cascade
//! difference rejects DC and high frequencies and passes the band around
//! the cutoff. All previous-generation taps come from the parity history.
//!
//! Coefficient stability (poles inside the unit circle) is checked at
//! configuration time; the filter itself is deterministic and stateless
//! apart from the history planes it reads and fills.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::Plane;

/// Second-order section coefficients: `a1, a2` feedback, `b0, b1, b2`
/// feed-forward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandpassCoeffs {
    pub a1: f32,
    pub a2: f32,
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
}

impl BandpassCoeffs {
    /// RBJ-style Butterworth low-pass section.
    pub fn lowpass(cutoff_hz: f32, q: f32, fps: f32) -> Self {
        let w0 = (2.0 * PI * cutoff_hz / fps).clamp(1e-4, PI - 1e-3);
        let alpha = w0.sin() / (2.0 * q.max(1e-6));
        let cw0 = w0.cos();

        let a0 = 1.0 + alpha;
        let inv_a0 = 1.0 / a0;

        Self {
            b0: ((1.0 - cw0) * 0.5) * inv_a0,
            b1: (1.0 - cw0) * inv_a0,
            b2: ((1.0 - cw0) * 0.5) * inv_a0,
            a1: (-2.0 * cw0) * inv_a0,
            a2: (1.0 - alpha) * inv_a0,
        }
    }

    /// Coefficients for a temporal pass-band `[low_hz, high_hz]`: a
    /// low-pass section at the geometric-mean frequency with Q set by the
    /// bandwidth. The cascade difference then peaks inside the band.
    pub fn for_band(low_hz: f32, high_hz: f32, fps: f32) -> Self {
        let fc = (low_hz * high_hz).max(0.0).sqrt();
        let bw = (high_hz - low_hz).max(1e-3);
        let q = (fc / bw).clamp(0.4, 4.0);
        Self::lowpass(fc, q, fps)
    }

    /// Both poles of `z^2 + a1*z + a2` strictly inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}

/// One temporal filter step for a single channel of a single level.
///
/// `x*` are the phase input at `t`, `t-1`, `t-2`; `lp1_*`/`lp2_*` the two
/// stage outputs at `t-1` and `t-2`. Writes the new stage outputs and the
/// band-passed change.
#[allow(clippy::too_many_arguments)]
pub fn bandpass_step(
    coeffs: &BandpassCoeffs,
    x: &Plane,
    x1: &Plane,
    x2: &Plane,
    lp1_prev: &Plane,
    lp1_prev2: &Plane,
    lp2_prev: &Plane,
    lp2_prev2: &Plane,
    lp1_out: &mut Plane,
    lp2_out: &mut Plane,
    change: &mut Plane,
) {
    let (h, w) = x.dim();
    let BandpassCoeffs { a1, a2, b0, b1, b2 } = *coeffs;
    for y in 0..h {
        for xx in 0..w {
            let l1p = lp1_prev[[y, xx]];
            let l1pp = lp1_prev2[[y, xx]];
            let l2p = lp2_prev[[y, xx]];
            let l2pp = lp2_prev2[[y, xx]];

            let l1 = b0 * x[[y, xx]] + b1 * x1[[y, xx]] + b2 * x2[[y, xx]] - a1 * l1p - a2 * l1pp;
            let l2 = b0 * l1 + b1 * l1p + b2 * l1pp - a1 * l2p - a2 * l2pp;

            lp1_out[[y, xx]] = l1;
            lp2_out[[y, xx]] = l2;
            change[[y, xx]] = l1 - l2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Drives `bandpass_step` on 1x1 planes with manual generation
    /// shuffling; returns the change sequence.
    fn run(coeffs: &BandpassCoeffs, input: impl Iterator<Item = f32>) -> Vec<f32> {
        let p = || Array2::<f32>::zeros((1, 1));
        let (mut x1, mut x2) = (p(), p());
        let (mut l1p, mut l1pp, mut l2p, mut l2pp) = (p(), p(), p(), p());
        let (mut l1, mut l2, mut change) = (p(), p(), p());
        let mut x = p();
        let mut out = Vec::new();
        for v in input {
            x[[0, 0]] = v;
            bandpass_step(
                coeffs, &x, &x1, &x2, &l1p, &l1pp, &l2p, &l2pp, &mut l1, &mut l2, &mut change,
            );
            out.push(change[[0, 0]]);
            x2.assign(&x1);
            x1.assign(&x);
            l1pp.assign(&l1p);
            l1p.assign(&l1);
            l2pp.assign(&l2p);
            l2p.assign(&l2);
        }
        out
    }

    #[test]
    fn test_design_is_stable() {
        let c = BandpassCoeffs::lowpass(1.0, 0.707, 30.0);
        assert!(c.is_stable());
        let c = BandpassCoeffs::for_band(0.2, 0.7, 30.0);
        assert!(c.is_stable());
        let c = BandpassCoeffs::for_band(5.0, 12.0, 60.0);
        assert!(c.is_stable());
    }

    #[test]
    fn test_pole_outside_unit_circle_rejected() {
        let unstable = BandpassCoeffs {
            a1: -2.5,
            a2: 1.3,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
        };
        assert!(!unstable.is_stable());
        let unstable = BandpassCoeffs {
            a1: 2.0,
            a2: 0.9,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
        };
        assert!(!unstable.is_stable());
    }

    #[test]
    fn test_dc_is_rejected() {
        let c = BandpassCoeffs::for_band(0.5, 2.0, 30.0);
        let out = run(&c, std::iter::repeat(0.8).take(1500));
        assert!(out.last().unwrap().abs() < 1e-3, "dc leak {}", out.last().unwrap());
    }

    #[test]
    fn test_bounded_input_stays_bounded() {
        let c = BandpassCoeffs::for_band(0.5, 2.0, 30.0);
        let out = run(&c, (0..10_000).map(|n| 0.5 + 0.5 * (0.3 * n as f32).sin()));
        for v in out {
            assert!(v.abs() < 10.0, "diverged to {v}");
        }
    }

    #[test]
    fn test_passband_vs_stopband() {
        let fps = 30.0;
        let c = BandpassCoeffs::lowpass(1.0, 0.9, fps);
        let tone = |hz: f32| {
            let out = run(
                &c,
                (0..600).map(move |n| (2.0 * PI * hz * n as f32 / fps).sin()),
            );
            out[400..].iter().fold(0.0f32, |m, v| m.max(v.abs()))
        };
        let in_band = tone(1.0);
        let stop_band = tone(10.0);
        assert!(in_band > 0.5, "in-band gain too low: {in_band}");
        assert!(stop_band < 0.1, "stop-band leak: {stop_band}");
        assert!(in_band > 5.0 * stop_band);
    }
}
