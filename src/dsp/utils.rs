//! Shared numeric floors and small helpers used across the pipeline stages.

/// Floor for the phase and amplitude denominators. Flat, textureless pixels
/// produce magnitudes near zero; flooring keeps the division deterministic
/// instead of blowing up.
pub const EPS: f32 = 1e-6;

/// Absolute floor for the regularizer's blurred-amplitude denominator.
/// Deliberately far above `EPS`: a neighborhood whose amplitude sits at the
/// epsilon floor must come out of the regularizer suppressed, not
/// renormalized back to full strength.
pub const AMP_FLOOR: f32 = 1e-3;

/// Rec.601 luminance weights for RGB input.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Offset in the chrominance ratio reattachment, matching the reference
/// reconstruction `lumaOut * c / (0.01 + lumaIn)`.
pub const CHROMA_EPS: f32 = 0.01;

#[inline]
pub fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}
