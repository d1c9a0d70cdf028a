//! Reference-amplitude calibration.
//!
//! Averages per-level, per-pixel analytic-signal amplitude over an
//! explicit warm-up window. The result is the baseline the regularizer
//! damps against in stabilized mode. Learning is windowed and must run to
//! completion: a partial window yields no reference, and stabilization
//! stays unavailable rather than silently approximated.

use log::info;
use ndarray::Array2;

use super::Plane;

pub struct AmplitudeCalibrator {
    window: usize,
    seen: usize,
    accum: Vec<Plane>,
}

impl AmplitudeCalibrator {
    /// `level_dims` in `(height, width)` per level; `window` is the number
    /// of calibration frames required.
    pub fn new(level_dims: &[(usize, usize)], window: usize) -> Self {
        Self {
            window,
            seen: 0,
            accum: level_dims
                .iter()
                .map(|&(h, w)| Array2::zeros((h, w)))
                .collect(),
        }
    }

    /// Accumulate one frame's per-level amplitude planes. Returns true once
    /// the window is complete; further frames are ignored.
    pub fn feed<'a>(&mut self, amps: impl Iterator<Item = &'a Plane>) -> bool {
        if self.is_complete() {
            return true;
        }
        if self.seen == 0 {
            info!("amplitude calibration started ({} frames)", self.window);
        }
        for (acc, amp) in self.accum.iter_mut().zip(amps) {
            *acc += amp;
        }
        self.seen += 1;
        if self.is_complete() {
            info!("amplitude calibration complete");
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.window > 0 && self.seen >= self.window
    }

    /// Fraction of the window consumed, 0..1.
    pub fn progress(&self) -> f32 {
        if self.window == 0 {
            return 0.0;
        }
        (self.seen as f32 / self.window as f32).min(1.0)
    }

    /// Per-level averaged amplitude, only once the window completed.
    pub fn finish(&self) -> Option<Vec<Plane>> {
        if !self.is_complete() {
            return None;
        }
        let inv = 1.0 / self.seen as f32;
        Some(self.accum.iter().map(|acc| acc * inv).collect())
    }

    /// Discard the learned window (new scene, reconfiguration).
    pub fn reset(&mut self) {
        self.seen = 0;
        for acc in self.accum.iter_mut() {
            acc.fill(0.0);
        }
    }
}
