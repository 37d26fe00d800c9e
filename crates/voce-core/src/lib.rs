//! Voce Core - realtime-safe primitives for the voce synthesis engine.
//!
//! This crate holds everything the engine and its swappable DSP cores agree
//! on: parameter structs, smoothing, the module-core traits, and small DSP
//! building blocks.
//!
//! # Core Components
//!
//! ## Module core traits
//!
//! Each module family (oscillator, filter, envelope generator, LFO) is
//! polymorphic over a "core" - an interchangeable algorithm behind a stable
//! render contract:
//!
//! - [`OscillatorCore`] - audio-rate signal generators
//! - [`FilterCore`] - per-voice filters with modulatable cutoff
//! - [`EnvelopeCore`] - gate-driven envelope state machines
//! - [`LfoCore`] - low-frequency control-signal generators
//!
//! Cores render fixed-size blocks (at most [`MAX_BLOCK_FRAMES`] frames),
//! consume only the engine-provided sample rate and pre-computed modulation
//! inputs, and never allocate or block.
//!
//! ## Parameter smoothing
//!
//! [`SmoothedParam`] (one-pole exponential) and [`LinearSmoothedParam`]
//! (constant rate) provide zipper-free parameter changes:
//!
//! ```rust
//! use voce_core::SmoothedParam;
//!
//! let mut gain = SmoothedParam::with_config(1.0, 48000.0, 10.0);
//! gain.set_target(0.5);
//! let smoothed = gain.advance();
//! ```
//!
//! ## Parameters
//!
//! Plain value structs ([`OscillatorParams`], [`FilterParams`],
//! [`EnvelopeParams`], [`LfoParams`], [`DcaParams`], [`DelayParams`]) form
//! the contract boundary between the host-facing parameter system and the
//! rendering core. They are copied in once per block and read-only while a
//! block renders.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! voce-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod delay_line;
pub mod math;
pub mod module;
pub mod param;
pub mod params;
pub mod tempo;

pub use delay_line::DelayLine;
pub use math::{
    cents_to_ratio, db_to_linear, flush_denormal, linear_to_db, midi_to_freq, semitones_to_ratio,
};
pub use module::{
    DEFAULT_BLOCK_FRAMES, EgPhase, EnvelopeCore, FilterCore, FilterModInputs, LfoCore,
    MAX_BLOCK_FRAMES, OscModInputs, OscillatorCore,
};
pub use param::{LinearSmoothedParam, SmoothedParam};
pub use params::{
    DcaParams, DelayParams, EnvelopeParams, FilterKind, FilterParams, LfoMode, LfoParams,
    LfoShape, OscWaveform, OscillatorParams, VoiceMode,
};
pub use tempo::{NoteDivision, TransportInfo};
