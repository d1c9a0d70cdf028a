//! Approximate Riesz transform of a band-pass level.
//!
//! The pair `(r1, r2)` is the band filtered by a 3-tap first-difference
//! kernel along x and y. For a band-pass input this approximates the two
//! quadrature (90-degree shifted) components of the analytic signal, which
//! is what the phase tracker needs. Pure per-frame spatial op with no
//! state: the previous frame's pair is recomputed from the stored band.

use super::Plane;

/// Fill `(r1, r2)` with the horizontal and vertical quadrature components
/// of `band`. Borders replicate, which leaves the edge rows/columns with a
/// half-magnitude difference - the same clamping the pyramid uses.
pub fn riesz_pair(band: &Plane, r1: &mut Plane, r2: &mut Plane) {
    let (h, w) = band.dim();
    debug_assert_eq!(r1.dim(), (h, w));
    debug_assert_eq!(r2.dim(), (h, w));
    for y in 0..h {
        for x in 0..w {
            let xp = (x + 1).min(w - 1);
            let xm = x.saturating_sub(1);
            let yp = (y + 1).min(h - 1);
            let ym = y.saturating_sub(1);
            r1[[y, x]] = 0.5 * (band[[y, xp]] - band[[y, xm]]);
            r2[[y, x]] = 0.5 * (band[[yp, x]] - band[[ym, x]]);
        }
    }
}
