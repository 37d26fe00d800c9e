//! Cascaded 24 dB/oct filter core.
//!
//! Two TPT stages in series with the resonance split equally between them,
//! which keeps the ringing under control at high Q while doubling the slope.
//! Both stages track the same modulated cutoff.

use voce_core::{FilterCore, FilterKind, FilterModInputs, FilterParams};

use crate::filter_svf::{TptStage, effective_cutoff};

/// 24 dB/oct cascade filter core.
///
/// Same modulation contract as the 12 dB/oct core: the two cutoff routes sum
/// in semitone space, key tracking blends toward the note frequency, and
/// drive saturates each stage independently.
///
/// ## Mod knobs
/// - A: none (reserved)
#[derive(Debug, Clone)]
pub struct LadderFilterCore {
    stage1: TptStage,
    stage2: TptStage,
    sample_rate: f32,
}

impl LadderFilterCore {
    /// Create a core at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            stage1: TptStage::default(),
            stage2: TptStage::default(),
            sample_rate,
        }
    }
}

impl FilterCore for LadderFilterCore {
    fn name(&self) -> &'static str {
        "ladder"
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.stage1.clear();
        self.stage2.clear();
    }

    fn reset(&mut self) {
        self.stage1.clear();
        self.stage2.clear();
    }

    fn render_block(&mut self, params: &FilterParams, mods: &FilterModInputs, buf: &mut [f32]) {
        if !params.enabled {
            return;
        }

        let cutoff = effective_cutoff(params, mods);
        // Split Q between the stages; each clamps to its own 0.5 minimum.
        let q_stage = (params.resonance * 0.5).max(0.5);
        self.stage1.tune(cutoff, q_stage, self.sample_rate);
        self.stage2.tune(cutoff, q_stage, self.sample_rate);
        let drive = params.drive.clamp(0.0, 1.0);

        for s in buf.iter_mut() {
            let (lp1, hp1, bp1) = self.stage1.tick(*s, drive);
            let mid = match params.kind {
                FilterKind::Lowpass => lp1,
                FilterKind::Highpass => hp1,
                FilterKind::Bandpass => bp1,
                FilterKind::Notch => lp1 + hp1,
            };
            let (lp2, hp2, bp2) = self.stage2.tick(mid, drive);
            *s = match params.kind {
                FilterKind::Lowpass => lp2,
                FilterKind::Highpass => hp2,
                FilterKind::Bandpass => bp2,
                FilterKind::Notch => lp2 + hp2,
            };
        }
    }
}
