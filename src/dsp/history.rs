//! Two-generation state history, addressed by frame parity.
//!
//! Every quantity that must survive the frame boundary lives here: the raw
//! Laplacian band, the accumulated phase rotation, and the four temporal
//! filter taps. Each is a fixed pair of planes indexed by `frame & 1` - an
//! arena with an index, not a queue. Frame `t` writes slot `t & 1`, so at
//! the start of frame `t` that slot still holds frame `t-2` and the other
//! slot holds frame `t-1`; the second-order temporal recurrence reads both.
//!
//! Planes are allocated once per level at configuration time and only ever
//! rewritten in place. `reset()` restores the start-of-stream state without
//! reallocating.

use ndarray::Array2;

use super::Plane;

/// Read-only view of one stored generation of a level's state.
pub struct Generation<'a> {
    pub band: &'a Plane,
    pub phase_c: &'a Plane,
    pub phase_s: &'a Plane,
    pub lowpass1_c: &'a Plane,
    pub lowpass2_c: &'a Plane,
    pub lowpass1_s: &'a Plane,
    pub lowpass2_s: &'a Plane,
}

/// The seven state planes of one pyramid level, two generations each.
pub struct LevelHistory {
    band: [Plane; 2],
    phase_c: [Plane; 2],
    phase_s: [Plane; 2],
    lowpass1_c: [Plane; 2],
    lowpass2_c: [Plane; 2],
    lowpass1_s: [Plane; 2],
    lowpass2_s: [Plane; 2],
}

impl LevelHistory {
    pub fn new(height: usize, width: usize) -> Self {
        let zeros = || [Array2::zeros((height, width)), Array2::zeros((height, width))];
        let mut hist = Self {
            band: zeros(),
            phase_c: zeros(),
            phase_s: zeros(),
            lowpass1_c: zeros(),
            lowpass2_c: zeros(),
            lowpass1_s: zeros(),
            lowpass2_s: zeros(),
        };
        hist.reset();
        hist
    }

    /// Start-of-stream state: zero bands and filter taps, identity phase
    /// rotation (cos = 1, sin = 0) in both generations.
    pub fn reset(&mut self) {
        for slot in 0..2 {
            self.band[slot].fill(0.0);
            self.phase_c[slot].fill(1.0);
            self.phase_s[slot].fill(0.0);
            self.lowpass1_c[slot].fill(0.0);
            self.lowpass2_c[slot].fill(0.0);
            self.lowpass1_s[slot].fill(0.0);
            self.lowpass2_s[slot].fill(0.0);
        }
    }

    #[inline]
    fn generation(&self, slot: usize) -> Generation<'_> {
        Generation {
            band: &self.band[slot],
            phase_c: &self.phase_c[slot],
            phase_s: &self.phase_s[slot],
            lowpass1_c: &self.lowpass1_c[slot],
            lowpass2_c: &self.lowpass2_c[slot],
            lowpass1_s: &self.lowpass1_s[slot],
            lowpass2_s: &self.lowpass2_s[slot],
        }
    }

    /// State as of frame `frame - 1`, seen from the current `frame`.
    #[inline]
    pub fn prev(&self, frame: u64) -> Generation<'_> {
        self.generation(((frame + 1) & 1) as usize)
    }

    /// State as of frame `frame - 2`. This is the slot `commit` will
    /// overwrite, so all reads must happen before the commit.
    #[inline]
    pub fn prev2(&self, frame: u64) -> Generation<'_> {
        self.generation((frame & 1) as usize)
    }

    /// Publish frame `frame`'s state into its parity slot. This is the only
    /// mutation of history during a frame; a cancelled frame simply never
    /// commits and the stored generations stay consistent.
    #[allow(clippy::too_many_arguments)]
    pub fn commit(
        &mut self,
        frame: u64,
        band: &Plane,
        phase_c: &Plane,
        phase_s: &Plane,
        lowpass1_c: &Plane,
        lowpass2_c: &Plane,
        lowpass1_s: &Plane,
        lowpass2_s: &Plane,
    ) {
        let slot = (frame & 1) as usize;
        self.band[slot].assign(band);
        self.phase_c[slot].assign(phase_c);
        self.phase_s[slot].assign(phase_s);
        self.lowpass1_c[slot].assign(lowpass1_c);
        self.lowpass2_c[slot].assign(lowpass2_c);
        self.lowpass1_s[slot].assign(lowpass1_s);
        self.lowpass2_s[slot].assign(lowpass2_s);
    }
}
