//! Voce Synth - the polyphonic voice-rendering engine.
//!
//! This crate is the synthesis core: a fixed-topology signal graph
//! (oscillators → filters → envelope generators → DCA → shared delay)
//! driven by a per-voice modulation matrix, rendered in fixed-size blocks
//! with sample-accurate MIDI handling.
//!
//! # Architecture
//!
//! - [`BlockProcessor`] - external-facing driver: slices host buffers of
//!   arbitrary length into engine blocks, fires timestamped MIDI events
//!   exactly at their sample offsets, applies parameter snapshots at block
//!   boundaries.
//! - [`SynthEngine`] - owns the fixed voice pool, applies the voice-mode
//!   policy (poly/mono/legato/unison), steals voices under polyphony
//!   pressure, mixes voices, and runs the shared [`StereoDelay`] and master
//!   volume.
//! - [`Voice`] - one synthesis chain bound to a note: 4 oscillator slots,
//!   2 filter slots, 3 envelope generators, 2 LFOs, a [`ModMatrix`], and
//!   the [`Dca`].
//! - [`ModMatrix`] - dense source × destination routing grid, pure
//!   summation, deterministic.
//!
//! The DSP algorithms behind every oscillator/filter/EG/LFO slot are
//! swappable cores selected by registry index (see `voce-registry`); this
//! crate never names a concrete algorithm outside its tests.
//!
//! # Example
//!
//! ```rust
//! use voce_synth::{BlockProcessor, EngineParams, MidiEvent, SynthEngine};
//! use voce_core::TransportInfo;
//!
//! let engine = SynthEngine::with_defaults(48000.0);
//! let mut proc = BlockProcessor::new(engine);
//!
//! proc.set_parameters(EngineParams::default());
//! proc.queue_event(MidiEvent::note_on(60, 100, 0));
//!
//! let mut left = vec![0.0f32; 480];
//! let mut right = vec![0.0f32; 480];
//! proc.process(&mut left, &mut right, &TransportInfo::default());
//! assert!(left.iter().any(|&s| s != 0.0));
//! ```
//!
//! # Real-time contract
//!
//! Rendering takes no locks, never blocks, and allocates only when a
//! parameter snapshot hot-swaps a DSP core. Out-of-range parameter values
//! clamp; unknown core indices fall back to defaults; malformed MIDI is
//! ignored; pool exhaustion steals. Nothing on the render path returns an
//! error - audio never stops.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (requires `alloc`). Disable the
//! default `std` feature:
//!
//! ```toml
//! [dependencies]
//! voce-synth = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod block;
pub mod dca;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod lfo;
pub mod midi;
pub mod mod_matrix;
pub mod oscillator;
pub mod params;
pub mod voice;

/// Oscillator slots per voice.
pub const NUM_OSCILLATORS: usize = 4;
/// Filter slots per voice (processed in series).
pub const NUM_FILTERS: usize = 2;
/// LFO slots per voice.
pub const NUM_LFOS: usize = 2;

pub use block::BlockProcessor;
pub use dca::Dca;
pub use engine::{DEFAULT_POLYPHONY, MAX_POLYPHONY, SynthEngine};
pub use envelope::SynthEnvelope;
pub use filter::SynthFilter;
pub use lfo::SynthLfo;
pub use midi::{EventQueue, MidiEvent, MidiEventKind};
pub use mod_matrix::{ModDest, ModMatrix, ModMatrixParams, ModSource, VoiceModValues};
pub use oscillator::SynthOscillator;
pub use params::{EngineParams, VoiceParams};
pub use voice::{Voice, VoiceRenderContext};

// Re-export the pieces of voce-core and voce-cores that appear in this
// crate's public API.
pub use voce_core::{
    DEFAULT_BLOCK_FRAMES, EgPhase, MAX_BLOCK_FRAMES, TransportInfo, VoiceMode,
};
pub use voce_cores::StereoDelay;
