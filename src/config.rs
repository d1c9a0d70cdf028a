//! Pipeline configuration and factory presets.
//!
//! Everything here is fixed before streaming begins: pyramid depth,
//! temporal filter coefficients, per-level amplification and
//! regularization tables, stabilization, and the calibration window.
//! `validate` runs against the frame dimensions at pipeline construction
//! and is the single gate for every configuration-time failure.

use serde::{Deserialize, Serialize};

use crate::dsp::temporal::BandpassCoeffs;
use crate::error::MagnifyError;

/// Minimum extent of the coarsest level, in pixels per axis.
const MIN_COARSE_EXTENT: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnifierConfig {
    /// Pyramid depth L. Level L-1 is the low-pass residual.
    pub levels: usize,
    /// Input channel count, fixed for the stream (1 or 3).
    pub channels: usize,
    /// Temporal band-pass coefficients, designed for the motion band.
    pub coeffs: BandpassCoeffs,
    /// Per-level amplification. Zero passes the level through untouched.
    pub alpha: Vec<f32>,
    /// Per-level regularization sigma, larger at coarser levels.
    pub band_sigma: Vec<f32>,
    /// Damp regularization against a calibrated amplitude baseline.
    pub stabilize: bool,
    /// Calibration window length in frames.
    pub calibration_frames: usize,
}

impl Default for MagnifierConfig {
    fn default() -> Self {
        Self {
            levels: 5,
            channels: 3,
            coeffs: BandpassCoeffs::for_band(0.5, 2.0, 30.0),
            alpha: default_alpha(5, 10.0),
            band_sigma: default_band_sigmas(5),
            stabilize: false,
            calibration_frames: 30,
        }
    }
}

impl MagnifierConfig {
    /// Check the configuration against fixed frame dimensions. Any error
    /// here is fatal: streaming must not start.
    pub fn validate(&self, width: usize, height: usize) -> Result<(), MagnifyError> {
        if self.levels < 2 {
            return Err(MagnifyError::InvalidDepth(self.levels));
        }
        if !self.coeffs.is_stable() {
            return Err(MagnifyError::UnstableCoefficients {
                a1: self.coeffs.a1,
                a2: self.coeffs.a2,
            });
        }
        if self.alpha.len() != self.levels {
            return Err(MagnifyError::LevelTableMismatch {
                table: "alpha",
                got: self.alpha.len(),
                expected: self.levels,
            });
        }
        if self.band_sigma.len() != self.levels {
            return Err(MagnifyError::LevelTableMismatch {
                table: "band_sigma",
                got: self.band_sigma.len(),
                expected: self.levels,
            });
        }
        if self.channels != 1 && self.channels != 3 {
            return Err(MagnifyError::UnsupportedChannels(self.channels));
        }
        let shift = self.levels - 1;
        if shift >= usize::BITS as usize
            || (width >> shift) < MIN_COARSE_EXTENT
            || (height >> shift) < MIN_COARSE_EXTENT
        {
            return Err(MagnifyError::PyramidTooDeep {
                levels: self.levels,
                width,
                height,
            });
        }
        Ok(())
    }

    /// Serialize for preset storage.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Zero at the two finest levels and the residual (noise-dominated and
/// low-pass respectively), `value` at the mid levels that carry motion.
pub fn default_alpha(levels: usize, value: f32) -> Vec<f32> {
    (0..levels)
        .map(|j| if j < 2 || j + 1 == levels { 0.0 } else { value })
        .collect()
}

/// Regularization sigma growing toward coarser levels, capped so tiny
/// coarse levels are not blurred past their extent.
pub fn default_band_sigmas(levels: usize) -> Vec<f32> {
    (0..levels).map(|j| (2.0 + j as f32).min(5.0)).collect()
}

// =============================================================================
// Factory presets
// =============================================================================

/// Factory presets for common magnification targets. Bands in Hz; the
/// temporal coefficients are designed against the capture frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagnifierPreset {
    #[serde(rename = "Breathing (0.2-0.7 Hz)")]
    Breathing,
    #[serde(rename = "Pulse (0.8-2 Hz)")]
    Pulse,
    #[serde(rename = "Structural Vibration (5-12 Hz)")]
    StructuralVibration,
}

impl MagnifierPreset {
    pub fn name(&self) -> &'static str {
        match self {
            MagnifierPreset::Breathing => "Breathing (0.2-0.7 Hz)",
            MagnifierPreset::Pulse => "Pulse (0.8-2 Hz)",
            MagnifierPreset::StructuralVibration => "Structural Vibration (5-12 Hz)",
        }
    }

    pub fn band_hz(&self) -> (f32, f32) {
        match self {
            MagnifierPreset::Breathing => (0.2, 0.7),
            MagnifierPreset::Pulse => (0.8, 2.0),
            MagnifierPreset::StructuralVibration => (5.0, 12.0),
        }
    }

    /// Build a configuration for this preset at the given frame rate.
    pub fn config(&self, fps: f32) -> MagnifierConfig {
        let (low, high) = self.band_hz();
        let alpha = match self {
            MagnifierPreset::Breathing => 25.0,
            MagnifierPreset::Pulse => 15.0,
            MagnifierPreset::StructuralVibration => 40.0,
        };
        MagnifierConfig {
            coeffs: BandpassCoeffs::for_band(low, high, fps),
            alpha: default_alpha(5, alpha),
            ..MagnifierConfig::default()
        }
    }
}
