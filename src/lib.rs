//! Phase-based video motion magnification.
//!
//! Amplifies subtle motion in a configured temporal frequency band by
//! manipulating local phase in a Riesz pyramid, rather than raw intensity.
//! Per frame: Laplacian decomposition, Riesz quadrature pair, phase change
//! tracking, temporal band-pass of the phase, amplitude-weighted spatial
//! regularization, per-level amplification, and pyramid collapse. All
//! cross-frame state lives in a two-generation parity history and is
//! allocated once at configuration time.

mod config;
pub mod dsp;
mod error;

pub use config::{default_alpha, default_band_sigmas, MagnifierConfig, MagnifierPreset};
pub use dsp::temporal::BandpassCoeffs;
pub use error::MagnifyError;

use log::{debug, info, warn};
use ndarray::{Array2, Array3, Zip};
use rayon::prelude::*;

use dsp::calibrate::AmplitudeCalibrator;
use dsp::history::LevelHistory;
use dsp::pyramid::{self, LaplacianPyramid};
use dsp::regularize::GaussianKernel;
use dsp::utils::{clamp01, CHROMA_EPS};
use dsp::{phase, regularize, riesz, temporal, Plane};

/// Frames `0..WARMUP_FRAMES` fill the pyramid, phase, and filter history
/// while the output is the plain pyramid round trip; the filtered path is
/// active from this frame on. Identical for every level.
const WARMUP_FRAMES: u64 = 4;

/// Per-level intermediates, allocated once and rewritten every frame. A
/// frame publishes into history only at commit, so an abandoned frame
/// leaves the stored generations untouched.
struct LevelScratch {
    r1: Plane,
    r2: Plane,
    r1_prev: Plane,
    r2_prev: Plane,
    delta_c: Plane,
    delta_s: Plane,
    phase_c: Plane,
    phase_s: Plane,
    lowpass1_c: Plane,
    lowpass2_c: Plane,
    lowpass1_s: Plane,
    lowpass2_s: Plane,
    change_c: Plane,
    change_s: Plane,
    amp: Plane,
    weight: Plane,
    prod: Plane,
    tmp: Plane,
    num: Plane,
    den: Plane,
    change_c2: Plane,
    change_s2: Plane,
}

impl LevelScratch {
    fn new(height: usize, width: usize) -> Self {
        let p = || Array2::zeros((height, width));
        Self {
            r1: p(),
            r2: p(),
            r1_prev: p(),
            r2_prev: p(),
            delta_c: p(),
            delta_s: p(),
            phase_c: p(),
            phase_s: p(),
            lowpass1_c: p(),
            lowpass2_c: p(),
            lowpass1_s: p(),
            lowpass2_s: p(),
            change_c: p(),
            change_s: p(),
            amp: p(),
            weight: p(),
            prod: p(),
            tmp: p(),
            num: p(),
            den: p(),
            change_c2: p(),
            change_s2: p(),
        }
    }
}

struct LevelState {
    alpha: f32,
    kernel: GaussianKernel,
    history: LevelHistory,
    scratch: LevelScratch,
    reference: Option<Plane>,
}

/// The streaming pipeline. One instance per stream; frame dimensions and
/// configuration are fixed for its lifetime. `&mut self` per frame is the
/// generation barrier: no frame's writes can overlap another's reads.
pub struct MotionMagnifier {
    config: MagnifierConfig,
    width: usize,
    height: usize,
    frame_index: u64,
    pyramid: LaplacianPyramid,
    levels: Vec<LevelState>,
    calibrator: AmplitudeCalibrator,
    luma: Plane,
}

impl MotionMagnifier {
    pub fn new(
        width: usize,
        height: usize,
        config: MagnifierConfig,
    ) -> Result<Self, MagnifyError> {
        config.validate(width, height)?;
        if config.stabilize && config.calibration_frames == 0 {
            warn!("stabilization enabled with an empty calibration window; it can never activate");
        }
        let dims = pyramid::level_dims(width, height, config.levels);
        let levels: Vec<LevelState> = dims
            .iter()
            .enumerate()
            .map(|(j, &(h, w))| LevelState {
                alpha: config.alpha[j],
                kernel: GaussianKernel::new(config.band_sigma[j]),
                history: LevelHistory::new(h, w),
                scratch: LevelScratch::new(h, w),
                reference: None,
            })
            .collect();
        info!(
            "magnifier configured: {}x{}x{}, {} levels, stabilize={}",
            width, height, config.channels, config.levels, config.stabilize
        );
        Ok(Self {
            pyramid: LaplacianPyramid::new(width, height, config.levels),
            calibrator: AmplitudeCalibrator::new(&dims, config.calibration_frames),
            levels,
            width,
            height,
            frame_index: 0,
            luma: Array2::zeros((height, width)),
            config,
        })
    }

    pub fn config(&self) -> &MagnifierConfig {
        &self.config
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// True once the history is warm and the filtered path drives output.
    pub fn is_steady(&self) -> bool {
        self.frame_index >= WARMUP_FRAMES
    }

    /// Restart the stream: history back to its start state, a fresh warm-up
    /// window ahead. A completed amplitude calibration is kept.
    pub fn reset(&mut self) {
        for lvl in self.levels.iter_mut() {
            lvl.history.reset();
        }
        self.frame_index = 0;
        info!("magnifier reset; rewarming from frame 0");
    }

    pub fn calibration_progress(&self) -> f32 {
        self.calibrator.progress()
    }

    /// Feed one frame of the calibration window (same format contract as
    /// `process_frame`). Returns the window progress in 0..1. Once the
    /// window completes the averaged amplitude becomes the stabilization
    /// reference; extra frames are ignored.
    pub fn calibrate_frame(&mut self, input: &Array3<f32>) -> Result<f32, MagnifyError> {
        self.check_frame(input.dim())?;
        pyramid::luminance(input, &mut self.luma);
        self.pyramid.decompose(&self.luma);
        for (band, lvl) in self.pyramid.bands().iter().zip(self.levels.iter_mut()) {
            riesz::riesz_pair(band, &mut lvl.scratch.r1, &mut lvl.scratch.r2);
            regularize::amplitude(band, &lvl.scratch.r1, &lvl.scratch.r2, &mut lvl.scratch.amp);
        }
        let complete = self
            .calibrator
            .feed(self.levels.iter().map(|l| &l.scratch.amp));
        if complete && self.levels[0].reference.is_none() {
            if let Some(reference) = self.calibrator.finish() {
                for (lvl, r) in self.levels.iter_mut().zip(reference) {
                    lvl.reference = Some(r);
                }
            }
        }
        Ok(self.calibrator.progress())
    }

    /// Magnify one luminance plane in `[0,1]`; writes the output plane.
    pub fn process_luma(&mut self, input: &Plane, output: &mut Plane) -> Result<(), MagnifyError> {
        let (h, w) = input.dim();
        if (h, w) != (self.height, self.width) || output.dim() != (h, w) {
            return Err(MagnifyError::FrameMismatch {
                got_width: w,
                got_height: h,
                got_channels: 1,
                width: self.width,
                height: self.height,
                channels: 1,
            });
        }
        self.ensure_stabilization_ready()?;
        self.luma.assign(input);
        self.run_frame();
        let out = self.pyramid.collapse();
        Zip::from(output).and(out).for_each(|o, &v| *o = clamp01(v));
        Ok(())
    }

    /// Magnify one frame in the configured channel layout. For 3-channel
    /// input the pipeline runs on luminance and chrominance is reattached
    /// per channel as `lumaOut * c / (0.01 + lumaIn)`, clamped to `[0,1]`.
    pub fn process_frame(
        &mut self,
        input: &Array3<f32>,
        output: &mut Array3<f32>,
    ) -> Result<(), MagnifyError> {
        self.check_frame(input.dim())?;
        self.check_frame(output.dim())?;
        self.ensure_stabilization_ready()?;
        pyramid::luminance(input, &mut self.luma);
        self.run_frame();
        let out_luma = self.pyramid.collapse();
        let (h, w, c) = input.dim();
        if c == 1 {
            for y in 0..h {
                for x in 0..w {
                    output[[y, x, 0]] = clamp01(out_luma[[y, x]]);
                }
            }
        } else {
            for y in 0..h {
                for x in 0..w {
                    let ratio = out_luma[[y, x]] / (CHROMA_EPS + self.luma[[y, x]]);
                    for ch in 0..c {
                        output[[y, x, ch]] = clamp01(input[[y, x, ch]] * ratio);
                    }
                }
            }
        }
        Ok(())
    }

    /// The per-frame core over `self.luma`: decompose, fan the level stage
    /// out across workers, leave the (possibly amplified) bands ready for
    /// collapse, advance the frame counter.
    fn run_frame(&mut self) {
        self.pyramid.decompose(&self.luma);
        let frame = self.frame_index;
        let steady = frame >= WARMUP_FRAMES;
        if frame == WARMUP_FRAMES {
            debug!("steady state reached at frame {frame}");
        }
        let coeffs = self.config.coeffs;
        let stabilize = self.config.stabilize;
        self.pyramid
            .bands_mut()
            .par_iter_mut()
            .zip(self.levels.par_iter_mut())
            .for_each(|(band, lvl)| level_step(band, lvl, frame, &coeffs, steady, stabilize));
        self.frame_index += 1;
    }

    fn check_frame(&self, dim: (usize, usize, usize)) -> Result<(), MagnifyError> {
        let (h, w, c) = dim;
        if (h, w, c) != (self.height, self.width, self.config.channels) {
            return Err(MagnifyError::FrameMismatch {
                got_width: w,
                got_height: h,
                got_channels: c,
                width: self.width,
                height: self.height,
                channels: self.config.channels,
            });
        }
        Ok(())
    }

    fn ensure_stabilization_ready(&self) -> Result<(), MagnifyError> {
        if self.config.stabilize && self.levels.iter().any(|l| l.reference.is_none()) {
            return Err(MagnifyError::CalibrationIncomplete);
        }
        Ok(())
    }
}

/// One level's slice of a frame: quadrature pair, phase update, temporal
/// filter, commit, and (in steady state) regularize + amplify in place.
fn level_step(
    band: &mut Plane,
    lvl: &mut LevelState,
    frame: u64,
    coeffs: &BandpassCoeffs,
    steady: bool,
    stabilize: bool,
) {
    let LevelState {
        alpha,
        kernel,
        history,
        scratch: s,
        reference,
    } = lvl;
    let alpha = *alpha;

    riesz::riesz_pair(band, &mut s.r1, &mut s.r2);
    {
        let prev = history.prev(frame);
        let prev2 = history.prev2(frame);
        // The previous quadrature pair is recomputed from the stored band;
        // only the band itself crosses the frame boundary.
        riesz::riesz_pair(prev.band, &mut s.r1_prev, &mut s.r2_prev);
        phase::phase_delta(
            band,
            &s.r1,
            &s.r2,
            prev.band,
            &s.r1_prev,
            &s.r2_prev,
            &mut s.delta_c,
            &mut s.delta_s,
        );
        phase::accumulate(
            prev.phase_c,
            prev.phase_s,
            &s.delta_c,
            &s.delta_s,
            &mut s.phase_c,
            &mut s.phase_s,
        );
        temporal::bandpass_step(
            coeffs,
            &s.phase_c,
            prev.phase_c,
            prev2.phase_c,
            prev.lowpass1_c,
            prev2.lowpass1_c,
            prev.lowpass2_c,
            prev2.lowpass2_c,
            &mut s.lowpass1_c,
            &mut s.lowpass2_c,
            &mut s.change_c,
        );
        temporal::bandpass_step(
            coeffs,
            &s.phase_s,
            prev.phase_s,
            prev2.phase_s,
            prev.lowpass1_s,
            prev2.lowpass1_s,
            prev.lowpass2_s,
            prev2.lowpass2_s,
            &mut s.lowpass1_s,
            &mut s.lowpass2_s,
            &mut s.change_s,
        );
    }
    // Publish this frame's generation before the band is amplified: history
    // always holds the raw decomposition.
    history.commit(
        frame,
        band,
        &s.phase_c,
        &s.phase_s,
        &s.lowpass1_c,
        &s.lowpass2_c,
        &s.lowpass1_s,
        &s.lowpass2_s,
    );

    if !steady || alpha == 0.0 {
        return;
    }

    regularize::amplitude(band, &s.r1, &s.r2, &mut s.amp);
    match (stabilize, reference.as_ref()) {
        (true, Some(r)) => regularize::stabilized_weight(&s.amp, r, &mut s.weight),
        _ => s.weight.assign(&s.amp),
    }
    regularize::regularize(
        &s.change_c,
        &s.change_s,
        &s.weight,
        kernel,
        &mut s.prod,
        &mut s.tmp,
        &mut s.num,
        &mut s.den,
        &mut s.change_c2,
        &mut s.change_s2,
    );

    // Re-inject the in-phase component; the sine channel stays diagnostic.
    Zip::from(&mut *band)
        .and(&s.change_c2)
        .for_each(|b, &c| *b += alpha * c);
}
