//! Voce Cores - built-in DSP cores for the voce synthesis engine.
//!
//! Each module family in a voice is polymorphic over a "core" (see
//! `voce_core::module`). This crate provides the default algorithm set:
//!
//! | Family | Core | Character |
//! |--------|------|-----------|
//! | Oscillator | [`VaOscillatorCore`] | PolyBLEP virtual analog |
//! | Oscillator | [`WavetableOscillatorCore`] | Band-limited wavetables |
//! | Filter | [`SvfFilterCore`] | TPT state variable, 12 dB/oct |
//! | Filter | [`LadderFilterCore`] | Cascaded 24 dB/oct |
//! | Envelope | [`AnalogEnvelopeCore`] | Exponential RC-style segments |
//! | Envelope | [`LinearEnvelopeCore`] | Constant-slope segments |
//! | LFO | [`ClassicLfoCore`] | Sine/tri/saw/square/S&H |
//!
//! [`StereoDelay`] is the engine-level shared delay effect.
//!
//! Additional cores can be registered alongside these through
//! `voce-registry`; nothing in this crate is privileged beyond occupying the
//! default registry slots.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! voce-cores = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod delay_fx;
pub mod eg_analog;
pub mod eg_linear;
pub mod filter_ladder;
pub mod filter_svf;
pub mod lfo_classic;
pub mod osc_va;
pub mod osc_wavetable;

pub use delay_fx::StereoDelay;
pub use eg_analog::AnalogEnvelopeCore;
pub use eg_linear::LinearEnvelopeCore;
pub use filter_ladder::LadderFilterCore;
pub use filter_svf::SvfFilterCore;
pub use lfo_classic::ClassicLfoCore;
pub use osc_va::VaOscillatorCore;
pub use osc_wavetable::WavetableOscillatorCore;
