//! Module parameter structs - the contract boundary with the host layer.
//!
//! These are plain value objects: numeric fields and closed enums, no
//! behavior beyond defaults. The host-facing parameter system owns the
//! smoothing and binding machinery; the engine copies the current values in
//! once per block, and everything downstream treats them as read-only for
//! that block. Out-of-range values are clamped by the consuming module, never
//! rejected - audio must not stop over a bad knob value.
//!
//! Every module carries four general-purpose `mod_knobs` in [0, 1]. Their
//! meaning is core-defined (the registry exposes per-core labels for host
//! UI); a core that uses none of them simply ignores the array.

use crate::tempo::NoteDivision;

/// Oscillator waveform selector for the built-in cores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OscWaveform {
    /// Pure fundamental.
    Sine,
    /// Odd harmonics, soft.
    Triangle,
    /// All harmonics, bright.
    #[default]
    Saw,
    /// Odd harmonics, hollow (50% pulse).
    Square,
    /// Variable-width pulse; width set by `pulse_width`.
    Pulse,
    /// White noise.
    Noise,
}

/// Filter response selector for the built-in cores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterKind {
    /// Pass below cutoff.
    #[default]
    Lowpass,
    /// Pass above cutoff.
    Highpass,
    /// Pass around cutoff.
    Bandpass,
    /// Reject around cutoff.
    Notch,
}

/// LFO waveform selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LfoShape {
    /// Smooth sinusoid.
    #[default]
    Sine,
    /// Linear up/down ramps.
    Triangle,
    /// Rising ramp with abrupt reset.
    Saw,
    /// Binary high/low.
    Square,
    /// Random level held for one cycle.
    SampleHold,
}

/// LFO phase behavior at note-on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LfoMode {
    /// Phase runs continuously across notes.
    #[default]
    Free,
    /// Phase restarts on every note-on.
    Retrigger,
}

/// Voice allocation policy for the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VoiceMode {
    /// One voice per simultaneous note, up to the pool size.
    #[default]
    Poly,
    /// Single voice, every note retriggers the envelopes.
    Mono,
    /// Single voice; overlapping notes glide without retriggering.
    Legato,
    /// N detuned voices per note, retriggering.
    Unison,
    /// N detuned voices per note, legato.
    UnisonLegato,
}

/// Configuration for one oscillator slot.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OscillatorParams {
    /// Registry index of the core algorithm.
    pub core_index: usize,
    /// Disabled slots render silence and are skipped.
    pub enabled: bool,
    /// Waveform selector (interpreted by the core).
    pub waveform: OscWaveform,
    /// Coarse tune in octaves, -4..=4.
    pub octave: i32,
    /// Coarse tune in semitones, -12..=12.
    pub semitones: i32,
    /// Fine tune in cents, -100..=100.
    pub cents: f32,
    /// Output level, 0..=1.
    pub level: f32,
    /// Pulse width for pulse waveforms, 0.02..=0.98.
    pub pulse_width: f32,
    /// Full-scale matrix pitch modulation range in semitones.
    pub pitch_mod_range: f32,
    /// Core-defined extra controls, each 0..=1.
    pub mod_knobs: [f32; 4],
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self {
            core_index: 0,
            enabled: true,
            waveform: OscWaveform::Saw,
            octave: 0,
            semitones: 0,
            cents: 0.0,
            level: 0.707,
            pulse_width: 0.5,
            pitch_mod_range: 12.0,
            mod_knobs: [0.0; 4],
        }
    }
}

impl OscillatorParams {
    /// Total coarse+fine tuning offset in cents.
    pub fn tuning_cents(&self) -> f32 {
        (self.octave * 1200 + self.semitones * 100) as f32 + self.cents
    }
}

/// Configuration for one filter slot.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterParams {
    /// Registry index of the core algorithm.
    pub core_index: usize,
    /// Disabled slots pass audio through untouched.
    pub enabled: bool,
    /// Filter response.
    pub kind: FilterKind,
    /// Base cutoff in Hz, 20..=20480.
    pub cutoff_hz: f32,
    /// Resonance (Q), 0.5..=20.
    pub resonance: f32,
    /// Nonlinear drive, 0..=1.
    pub drive: f32,
    /// Keyboard tracking amount, 0..=1. At 1 the cutoff follows the note
    /// frequency fully.
    pub key_track: f32,
    /// Full-scale bipolar cutoff modulation range in semitones.
    pub mod_range: f32,
    /// Full-scale EG-route cutoff modulation range in semitones.
    pub eg_mod_range: f32,
    /// Core-defined extra controls, each 0..=1.
    pub mod_knobs: [f32; 4],
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            core_index: 0,
            enabled: true,
            kind: FilterKind::Lowpass,
            cutoff_hz: 1000.0,
            resonance: 0.707,
            drive: 0.0,
            key_track: 0.0,
            mod_range: 48.0,
            eg_mod_range: 48.0,
            mod_knobs: [0.0; 4],
        }
    }
}

/// Configuration for one envelope generator slot.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvelopeParams {
    /// Registry index of the core algorithm.
    pub core_index: usize,
    /// Attack time in milliseconds, 0.1..=10000.
    pub attack_ms: f32,
    /// Decay time in milliseconds, 0.1..=10000.
    pub decay_ms: f32,
    /// Sustain level, 0..=1.
    pub sustain: f32,
    /// Release time in milliseconds, 0.1..=10000.
    pub release_ms: f32,
    /// Core-defined extra controls, each 0..=1. For the built-in cores,
    /// knob A is the attack start level: a fresh trigger from `Idle` begins
    /// the attack segment at this level instead of zero.
    pub mod_knobs: [f32; 4],
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            core_index: 0,
            attack_ms: 10.0,
            decay_ms: 100.0,
            sustain: 0.707,
            release_ms: 200.0,
            mod_knobs: [0.0; 4],
        }
    }
}

/// Configuration for one LFO slot.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LfoParams {
    /// Registry index of the core algorithm.
    pub core_index: usize,
    /// Waveform.
    pub shape: LfoShape,
    /// Phase behavior at note-on.
    pub mode: LfoMode,
    /// Rate in Hz, 0.02..=20. Ignored when `tempo_sync` is set.
    pub rate_hz: f32,
    /// Output depth scaler, 0..=1.
    pub depth: f32,
    /// Derive the rate from the host tempo and `division`.
    pub tempo_sync: bool,
    /// Note division used when `tempo_sync` is set.
    pub division: NoteDivision,
    /// Core-defined extra controls, each 0..=1. For the built-in core,
    /// knob A quantizes the output into discrete steps.
    pub mod_knobs: [f32; 4],
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            core_index: 0,
            shape: LfoShape::Sine,
            mode: LfoMode::Free,
            rate_hz: 5.0,
            depth: 1.0,
            tempo_sync: false,
            division: NoteDivision::Quarter,
            mod_knobs: [0.0; 4],
        }
    }
}

/// Configuration for the per-voice output stage (DCA).
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DcaParams {
    /// Static gain in dB, -60..=12.
    pub gain_db: f32,
    /// Pan position, -1 (left) ..= 1 (right).
    pub pan: f32,
    /// How much MIDI velocity scales the gain, 0..=1. At 0 velocity is
    /// ignored; at 1 the gain tracks velocity fully.
    pub velocity_sensitivity: f32,
}

impl Default for DcaParams {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            pan: 0.0,
            velocity_sensitivity: 1.0,
        }
    }
}

/// Configuration for the engine's shared stereo delay.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DelayParams {
    /// Bypass when false.
    pub enabled: bool,
    /// Delay time in milliseconds. Clamped to the delay line capacity.
    pub time_ms: f32,
    /// Feedback amount, 0..=0.95.
    pub feedback: f32,
    /// Wet/dry mix, 0..=1.
    pub mix: f32,
    /// Cross-feed the feedback between channels.
    pub ping_pong: bool,
    /// Derive the delay time from the host tempo and `division`.
    pub tempo_sync: bool,
    /// Note division used when `tempo_sync` is set.
    pub division: NoteDivision,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            enabled: false,
            time_ms: 300.0,
            feedback: 0.4,
            mix: 0.3,
            ping_pong: false,
            tempo_sync: false,
            division: NoteDivision::Quarter,
        }
    }
}
