//! State variable filter core (TPT, 12 dB/oct).
//!
//! Topology-Preserving Transform SVF after Zavalishin, "The Art of VA Filter
//! Design". The trapezoidal discretization keeps the analog prototype's
//! response and stays stable under cutoff modulation, which matters here: the
//! modulation matrix sweeps cutoff every block.
//!
//! Cutoff modulation arrives on two routes - a bipolar route and an
//! EG-specific route - and both are summed in semitone space before the
//! exponential is applied. Drive saturates the bandpass integrator state
//! only, adding harmonics at high levels without changing the small-signal
//! response.

use libm::{powf, tanf, tanhf};
use voce_core::{FilterCore, FilterKind, FilterModInputs, FilterParams, flush_denormal};

use core::f32::consts::PI;

/// Reference frequency for keyboard tracking (C4).
const KEY_TRACK_REF_HZ: f32 = 261.63;

/// One TPT integrator pair - the state and coefficient math shared by the
/// 2-pole core here and the cascaded 4-pole core in `filter_ladder`.
#[derive(Debug, Clone, Default)]
pub(crate) struct TptStage {
    ic1eq: f32,
    ic2eq: f32,
    g: f32,
    k: f32,
}

impl TptStage {
    /// Recompute coefficients for the given cutoff/Q at `sample_rate`.
    #[inline]
    pub(crate) fn tune(&mut self, cutoff_hz: f32, q: f32, sample_rate: f32) {
        let cutoff = cutoff_hz.clamp(20.0, sample_rate * 0.49);
        self.g = tanf(PI * cutoff / sample_rate);
        self.k = 1.0 / q.clamp(0.5, 20.0);
    }

    /// Advance one sample; returns (lowpass, highpass, bandpass).
    #[inline]
    pub(crate) fn tick(&mut self, input: f32, drive: f32) -> (f32, f32, f32) {
        let v3 = input - self.ic2eq;
        let v1 = (self.g * v3 + self.ic1eq) / (1.0 + self.g * (self.g + self.k));
        let v2 = self.ic2eq + self.g * v1;

        // Saturate the integrator state, not the output: response is
        // unchanged at low levels, harmonics appear as the level rises.
        let v1_state = if drive > 0.0 {
            let d = 1.0 + drive * 3.0;
            tanhf(v1 * d) / d
        } else {
            v1
        };

        self.ic1eq = flush_denormal(2.0 * v1_state - self.ic1eq);
        self.ic2eq = flush_denormal(2.0 * v2 - self.ic2eq);

        let lp = v2;
        let bp = v1;
        let hp = input - self.k * v1 - v2;
        (lp, hp, bp)
    }

    /// Clear the integrator state.
    pub(crate) fn clear(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

/// Combine the summed modulation routes and key tracking into an effective
/// cutoff. Shared by both built-in filter cores.
#[inline]
pub(crate) fn effective_cutoff(params: &FilterParams, mods: &FilterModInputs) -> f32 {
    // Key tracking blends the base cutoff toward the note frequency.
    let mut cutoff = params.cutoff_hz.clamp(20.0, 20480.0);
    let key_track = params.key_track.clamp(0.0, 1.0);
    if key_track > 0.0 && mods.key_freq_hz > 0.0 {
        cutoff *= powf(mods.key_freq_hz / KEY_TRACK_REF_HZ, key_track);
    }

    // Both matrix routes sum in semitone space; the matrix never collapses
    // them.
    let semis = mods.cutoff.clamp(-1.0, 1.0) * params.mod_range
        + mods.cutoff_eg.clamp(0.0, 1.0) * params.eg_mod_range;
    cutoff * powf(2.0, semis / 12.0)
}

/// TPT state variable filter core with lowpass, highpass, bandpass, and
/// notch outputs.
///
/// ## Mod knobs
/// - A: none (reserved)
#[derive(Debug, Clone)]
pub struct SvfFilterCore {
    stage: TptStage,
    sample_rate: f32,
}

impl SvfFilterCore {
    /// Create a core at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            stage: TptStage::default(),
            sample_rate,
        }
    }
}

impl FilterCore for SvfFilterCore {
    fn name(&self) -> &'static str {
        "svf"
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.stage.clear();
    }

    fn reset(&mut self) {
        self.stage.clear();
    }

    fn render_block(&mut self, params: &FilterParams, mods: &FilterModInputs, buf: &mut [f32]) {
        if !params.enabled {
            return;
        }

        // Coefficients held for the block; modulation is block-rate.
        let cutoff = effective_cutoff(params, mods);
        self.stage.tune(cutoff, params.resonance, self.sample_rate);
        let drive = params.drive.clamp(0.0, 1.0);

        for s in buf.iter_mut() {
            let (lp, hp, bp) = self.stage.tick(*s, drive);
            *s = match params.kind {
                FilterKind::Lowpass => lp,
                FilterKind::Highpass => hp,
                FilterKind::Bandpass => bp,
                FilterKind::Notch => lp + hp,
            };
        }
    }
}
