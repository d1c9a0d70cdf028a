//! Error types for the magnification pipeline.
//!
//! Everything here is a configuration- or calibration-time failure: the
//! streaming core has no transient error modes of its own. Near-zero
//! denominators inside the phase and amplitude math are handled locally by
//! epsilon floors and never surface as errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MagnifyError {
    #[error("Unstable temporal filter coefficients (a1={a1}, a2={a2}): poles outside the unit circle")]
    UnstableCoefficients { a1: f32, a2: f32 },

    #[error("Pyramid depth must be at least 2, got {0}")]
    InvalidDepth(usize),

    #[error("Pyramid depth {levels} too deep for a {width}x{height} frame")]
    PyramidTooDeep {
        levels: usize,
        width: usize,
        height: usize,
    },

    #[error("Per-level table `{table}` has {got} entries, expected {expected}")]
    LevelTableMismatch {
        table: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("Unsupported channel count {0}: expected 1 or 3")]
    UnsupportedChannels(usize),

    #[error("Frame is {got_width}x{got_height}x{got_channels}, pipeline configured for {width}x{height}x{channels}")]
    FrameMismatch {
        got_width: usize,
        got_height: usize,
        got_channels: usize,
        width: usize,
        height: usize,
        channels: usize,
    },

    #[error("Stabilization requested without a completed amplitude calibration")]
    CalibrationIncomplete,
}
