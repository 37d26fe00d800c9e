//! Voice- and engine-level parameter snapshots.
//!
//! `EngineParams` is the single value the host-facing layer hands the block
//! processor; it nests `VoiceParams`, which nests the per-module structs
//! from `voce-core` plus the modulation matrix grid. The audio thread copies
//! the snapshot at block start and treats it as read-only for the block.

use voce_core::{
    DcaParams, DelayParams, EnvelopeParams, FilterParams, LfoParams, OscillatorParams, VoiceMode,
};

use crate::mod_matrix::ModMatrixParams;
use crate::{NUM_FILTERS, NUM_LFOS, NUM_OSCILLATORS};

/// Everything one voice reads while rendering a block.
#[derive(Clone, Copy, Debug)]
pub struct VoiceParams {
    /// Oscillator slots. Slot 1 is enabled by default, the rest disabled.
    pub oscillators: [OscillatorParams; NUM_OSCILLATORS],
    /// Filter slots, processed in series.
    pub filters: [FilterParams; NUM_FILTERS],
    /// Amplitude envelope (drives the DCA).
    pub amp_eg: EnvelopeParams,
    /// Filter envelope (matrix source, feeds the EG cutoff routes).
    pub filter_eg: EnvelopeParams,
    /// Auxiliary envelope (general-purpose matrix source).
    pub aux_eg: EnvelopeParams,
    /// LFO slots.
    pub lfos: [LfoParams; NUM_LFOS],
    /// Output stage.
    pub dca: DcaParams,
    /// Modulation matrix grid.
    pub matrix: ModMatrixParams,
    /// Glide time in milliseconds for glide-enabled voice modes.
    pub glide_time_ms: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        let mut oscillators = [OscillatorParams::default(); NUM_OSCILLATORS];
        for p in oscillators.iter_mut().skip(1) {
            p.enabled = false;
        }
        let mut filters = [FilterParams::default(); NUM_FILTERS];
        // Second filter defaults to bypass; one 12 dB/oct lowpass is the
        // neutral starting sound.
        filters[1].enabled = false;

        Self {
            oscillators,
            filters,
            amp_eg: EnvelopeParams::default(),
            filter_eg: EnvelopeParams::default(),
            aux_eg: EnvelopeParams::default(),
            lfos: [LfoParams::default(); NUM_LFOS],
            dca: DcaParams::default(),
            matrix: ModMatrixParams::default(),
            glide_time_ms: 0.0,
        }
    }
}

/// The complete engine snapshot.
#[derive(Clone, Copy, Debug)]
pub struct EngineParams {
    /// Voice allocation policy.
    pub voice_mode: VoiceMode,
    /// Voices stacked per note in the unison modes, 2..=8.
    pub unison_voices: usize,
    /// Total unison detune spread in cents; voices sit symmetrically in
    /// [-spread, +spread].
    pub unison_detune_cents: f32,
    /// Stereo spread of unison voices, 0 (mono) ..= 1 (full field).
    pub unison_stereo_spread: f32,
    /// Master output volume in dB, -60..=12.
    pub master_volume_db: f32,
    /// Master tuning offset in cents, -100..=100.
    pub master_tune_cents: f32,
    /// Pitch-bend range in semitones, 0..=24.
    pub pitch_bend_range: f32,
    /// Shared delay effect on the engine output bus.
    pub delay: DelayParams,
    /// Per-voice configuration (shared by every voice in the pool).
    pub voice: VoiceParams,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            voice_mode: VoiceMode::Poly,
            unison_voices: 4,
            unison_detune_cents: 15.0,
            unison_stereo_spread: 1.0,
            master_volume_db: 0.0,
            master_tune_cents: 0.0,
            pitch_bend_range: 2.0,
            delay: DelayParams::default(),
            voice: VoiceParams::default(),
        }
    }
}
