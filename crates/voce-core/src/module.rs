//! Module core traits - the seam between the voice graph and swappable DSP.
//!
//! Each module family in a voice (oscillator, filter, envelope generator,
//! LFO) is polymorphic over a "core": one concrete algorithm behind a stable
//! contract. Cores are selected at run time by a registry index, so a voice
//! can hot-swap a virtual-analog oscillator for a wavetable one without the
//! surrounding graph changing.
//!
//! ## Render contract
//!
//! All cores follow the same rules:
//!
//! - `render_block` is called with at most [`MAX_BLOCK_FRAMES`] frames and
//!   must be total over its inputs: no allocation, no panics, no blocking.
//! - Parameters arrive as a read-only struct rebuilt by the engine each
//!   block; out-of-range values are clamped at the point of use.
//! - Modulation inputs are already computed for the block (the voice runs
//!   LFOs and EGs first, then the matrix, then audio modules).
//! - `set_sample_rate` and `reset` may do sample-rate-dependent work; they
//!   are only invoked from engine initialize/reset, never mid-render.

use crate::params::{EnvelopeParams, FilterParams, LfoParams, OscillatorParams};

/// Upper bound on frames per render block. Buffers inside voices are sized to
/// this at construction so rendering never allocates.
pub const MAX_BLOCK_FRAMES: usize = 128;

/// Default engine block size in frames.
pub const DEFAULT_BLOCK_FRAMES: usize = 64;

/// Envelope generator phase.
///
/// Transitions are monotonic through the list except retrigger (any phase →
/// `Attack`) and shutdown (any phase → `Shutdown`, the fast-release ramp used
/// when a voice is hard-stolen).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EgPhase {
    /// Output is zero; the owning voice may be reused.
    #[default]
    Idle,
    /// Rising toward peak after gate-on.
    Attack,
    /// Falling from peak toward the sustain level.
    Decay,
    /// Holding the sustain level while the gate is on.
    Sustain,
    /// Falling toward zero after gate-off.
    Release,
    /// Fast fixed-time ramp to zero after a hard voice-steal.
    Shutdown,
}

impl EgPhase {
    /// True for any phase that produces output.
    #[inline]
    pub fn is_active(self) -> bool {
        self != EgPhase::Idle
    }

    /// True while heading toward zero (`Release` or `Shutdown`).
    #[inline]
    pub fn is_releasing(self) -> bool {
        matches!(self, EgPhase::Release | EgPhase::Shutdown)
    }
}

/// Per-block modulation inputs for an oscillator core.
///
/// The voice computes these once per block from glide, pitch bend, tuning,
/// and the modulation matrix; the core consumes them as constants for the
/// duration of the block.
#[derive(Clone, Copy, Debug, Default)]
pub struct OscModInputs {
    /// Base frequency in Hz after note, unison detune, glide, bend, and
    /// master tuning. Excludes matrix modulation.
    pub frequency_hz: f32,
    /// Matrix pitch modulation, normalized [-1, 1]. The core scales it by
    /// the parameter struct's pitch mod range (in semitones).
    pub pitch: f32,
    /// Matrix shape modulation, normalized [-1, 1]. Meaning is core-defined
    /// (pulse width for VA cores, table morph for wavetable cores).
    pub shape: f32,
}

/// Per-block modulation inputs for a filter core.
///
/// Cutoff has two routes through the matrix - a general bipolar route and an
/// EG-specific route. Both are delivered here and summed in semitone space by
/// the core; the matrix never collapses them.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterModInputs {
    /// Bipolar cutoff modulation, normalized [-1, 1].
    pub cutoff: f32,
    /// EG-route cutoff modulation, normalized [0, 1].
    pub cutoff_eg: f32,
    /// Frequency of the sounding note in Hz, for keyboard tracking.
    pub key_freq_hz: f32,
}

/// Audio-rate signal generator behind a voice oscillator slot.
pub trait OscillatorCore: Send {
    /// Short identifier for host display ("va", "wavetable", ...).
    fn name(&self) -> &'static str;

    /// Update the sample rate. Called from initialize/reset only.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Clear phase and internal state.
    fn reset(&mut self);

    /// Note-on notification: retune and restart the waveform cycle.
    fn note_on(&mut self, frequency_hz: f32);

    /// Render one block of audio into `out`.
    fn render_block(&mut self, params: &OscillatorParams, mods: &OscModInputs, out: &mut [f32]);
}

/// Per-voice audio filter behind a voice filter slot. Processes in place.
pub trait FilterCore: Send {
    /// Short identifier for host display ("svf", "ladder", ...).
    fn name(&self) -> &'static str;

    /// Update the sample rate. Called from initialize/reset only.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Clear filter state (delay elements), keeping parameters.
    fn reset(&mut self);

    /// Filter one block of audio in place.
    fn render_block(&mut self, params: &FilterParams, mods: &FilterModInputs, buf: &mut [f32]);
}

/// Gate-driven envelope state machine behind a voice EG slot.
///
/// Output is one control value per sample in [0, 1]. The per-sample
/// resolution matters: the amplitude envelope feeds the DCA directly and a
/// block-rate envelope would click on fast attacks.
pub trait EnvelopeCore: Send {
    /// Short identifier for host display ("analog", "linear", ...).
    fn name(&self) -> &'static str;

    /// Update the sample rate. Called from initialize/reset only.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Force the envelope to `Idle` at zero output.
    fn reset(&mut self);

    /// Current phase.
    fn phase(&self) -> EgPhase;

    /// Current output level without advancing.
    fn level(&self) -> f32;

    /// Gate on. Enters `Attack` from any phase, continuing from the current
    /// output level. With `legato` set, an already-active envelope keeps its
    /// phase instead of retriggering.
    fn gate_on(&mut self, params: &EnvelopeParams, legato: bool);

    /// Gate off. Any active phase transitions to `Release`.
    fn gate_off(&mut self);

    /// Hard-steal shutdown: fast fixed-time ramp to zero, then `Idle`.
    fn shutdown(&mut self);

    /// Render one block of envelope values into `out`.
    fn render_block(&mut self, params: &EnvelopeParams, out: &mut [f32]);

    /// True when the envelope is producing output.
    fn is_active(&self) -> bool {
        self.phase().is_active()
    }

    /// True while releasing or shutting down.
    fn is_releasing(&self) -> bool {
        self.phase().is_releasing()
    }
}

/// Low-frequency control-signal generator behind a voice LFO slot.
///
/// Output is one value per sample in [-1, 1].
pub trait LfoCore: Send {
    /// Short identifier for host display ("classic", ...).
    fn name(&self) -> &'static str;

    /// Update the sample rate. Called from initialize/reset only.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Clear phase and held state.
    fn reset(&mut self);

    /// Note-on notification: restart phase when the params ask for retrigger.
    fn note_on(&mut self, params: &LfoParams);

    /// Render one block of control values into `out`. `bpm` feeds tempo sync
    /// and is ignored by free-running configurations.
    fn render_block(&mut self, params: &LfoParams, bpm: f32, out: &mut [f32]);
}
