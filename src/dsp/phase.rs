//! Instantaneous phase change between frames, and its accumulation.
//!
//! The phase delta comes from the conjugate product of the current and
//! previous analytic-signal triplets `(band, r1, r2)`: the dot term carries
//! the cosine of the frame-to-frame rotation, the cross terms carry its
//! sine split across the two quadrature axes. Projecting the cross terms
//! onto the local orientation turns them into a signed scalar delta, and
//! normalizing by the product magnitude yields `(cos d, sin d)` directly -
//! no trig calls per pixel.
//!
//! The running state is the unit rotation `(phaseC, phaseS)` of the
//! cumulative phase since stream start; each frame's delta is folded in by
//! the angle-addition identities, so the representation never wraps and
//! `phaseC^2 + phaseS^2` stays 1.
//!
//! Flat, textureless pixels make every term vanish; the magnitude floor
//! turns those into the identity rotation instead of a division blowup.

use ndarray::Zip;

use super::utils::EPS;
use super::Plane;

/// Per-pixel `(cos, sin)` of the phase change from the previous frame's
/// triplet to the current one.
#[allow(clippy::too_many_arguments)]
pub fn phase_delta(
    band: &Plane,
    r1: &Plane,
    r2: &Plane,
    band_prev: &Plane,
    r1_prev: &Plane,
    r2_prev: &Plane,
    delta_c: &mut Plane,
    delta_s: &mut Plane,
) {
    let (h, w) = band.dim();
    for y in 0..h {
        for x in 0..w {
            let b = band[[y, x]];
            let q1 = r1[[y, x]];
            let q2 = r2[[y, x]];
            let bp = band_prev[[y, x]];
            let q1p = r1_prev[[y, x]];
            let q2p = r2_prev[[y, x]];

            let dot = b * bp + q1 * q1p + q2 * q2p;
            // Conjugate-product cross terms: positive when the phase advanced.
            let c1 = bp * q1 - b * q1p;
            let c2 = bp * q2 - b * q2p;
            // Signed delta: project the cross vector onto the local
            // orientation of the current quadrature pair.
            let orient = (q1 * q1 + q2 * q2).sqrt();
            let cross = if orient > EPS {
                (c1 * q1 + c2 * q2) / orient
            } else {
                0.0
            };

            let mag = (dot * dot + cross * cross).sqrt();
            if mag > EPS {
                delta_c[[y, x]] = dot / mag;
                delta_s[[y, x]] = cross / mag;
            } else {
                delta_c[[y, x]] = 1.0;
                delta_s[[y, x]] = 0.0;
            }
        }
    }
}

/// Rotate the accumulated phase by this frame's delta.
pub fn accumulate(
    phase_c_prev: &Plane,
    phase_s_prev: &Plane,
    delta_c: &Plane,
    delta_s: &Plane,
    phase_c: &mut Plane,
    phase_s: &mut Plane,
) {
    Zip::from(phase_c)
        .and(phase_s)
        .and(phase_c_prev)
        .and(phase_s_prev)
        .and(delta_c)
        .and(delta_s)
        .for_each(|c, s, &cp, &sp, &dc, &ds| {
            *c = cp * dc - sp * ds;
            *s = sp * dc + cp * ds;
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Analytic-signal model of a horizontally oriented band at phase
    /// `phi`: band = cos(phi), r1 = sin(phi), r2 = 0.
    fn triplet(h: usize, w: usize, phi: f32) -> (Plane, Plane, Plane) {
        (
            Array2::from_elem((h, w), phi.cos()),
            Array2::from_elem((h, w), phi.sin()),
            Array2::zeros((h, w)),
        )
    }

    #[test]
    fn test_delta_of_known_rotation() {
        let (b0, r10, r20) = triplet(4, 4, 0.3);
        let (b1, r11, r21) = triplet(4, 4, 0.3 + 0.05);
        let mut dc = Array2::zeros((4, 4));
        let mut ds = Array2::zeros((4, 4));
        phase_delta(&b1, &r11, &r21, &b0, &r10, &r20, &mut dc, &mut ds);
        assert!((dc[[1, 1]] - 0.05f32.cos()).abs() < 1e-4);
        assert!((ds[[1, 1]] - 0.05f32.sin()).abs() < 1e-4);
    }

    #[test]
    fn test_accumulation_tracks_cumulative_angle() {
        let step = 0.05f32;
        let mut phi = 0.3f32;
        let mut phase_c = Array2::from_elem((4, 4), 1.0);
        let mut phase_s = Array2::zeros((4, 4));
        let mut dc = Array2::zeros((4, 4));
        let mut ds = Array2::zeros((4, 4));
        let mut new_c = Array2::zeros((4, 4));
        let mut new_s = Array2::zeros((4, 4));

        for n in 1..=40 {
            let (bp, r1p, r2p) = triplet(4, 4, phi);
            let (b, r1, r2) = triplet(4, 4, phi + step);
            phi += step;
            phase_delta(&b, &r1, &r2, &bp, &r1p, &r2p, &mut dc, &mut ds);
            accumulate(&phase_c, &phase_s, &dc, &ds, &mut new_c, &mut new_s);
            phase_c.assign(&new_c);
            phase_s.assign(&new_s);

            let expect = step * n as f32;
            assert!(
                (phase_c[[2, 2]] - expect.cos()).abs() < 1e-3,
                "frame {n}: cos {} vs {}",
                phase_c[[2, 2]],
                expect.cos()
            );
            assert!((phase_s[[2, 2]] - expect.sin()).abs() < 1e-3);

            // Unit-magnitude invariant.
            let norm = phase_c[[2, 2]] * phase_c[[2, 2]] + phase_s[[2, 2]] * phase_s[[2, 2]];
            assert!((norm - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_flat_region_is_identity() {
        // Constant band with zero quadrature: no orientation, no rotation.
        let b = Array2::from_elem((4, 4), 0.7);
        let z = Array2::zeros((4, 4));
        let mut dc = Array2::zeros((4, 4));
        let mut ds = Array2::zeros((4, 4));
        phase_delta(&b, &z, &z, &b, &z, &z, &mut dc, &mut ds);
        assert_eq!(dc[[0, 0]], 1.0);
        assert_eq!(ds[[0, 0]], 0.0);
    }

    #[test]
    fn test_zero_signal_is_identity() {
        let z = Array2::zeros((4, 4));
        let mut dc = Array2::zeros((4, 4));
        let mut ds = Array2::zeros((4, 4));
        phase_delta(&z, &z, &z, &z, &z, &z, &mut dc, &mut ds);
        assert_eq!(dc[[2, 3]], 1.0);
        assert_eq!(ds[[2, 3]], 0.0);
    }
}
