//! Voce Config - host-side configuration for the voce synthesis engine.
//!
//! The rendering core consumes plain parameter structs (`EngineParams`) and
//! never touches files or strings; this crate is the host-facing layer that
//! produces those structs from TOML:
//!
//! - [`EngineConfig`] - typed schema of an engine setup file, every field
//!   optional
//! - name resolution: core algorithm names and matrix route names resolve
//!   against the `voce-registry`, with typos reported as setup errors
//! - range policy: out-of-range numerics clamp with a `tracing` warning,
//!   matching the engine's own clamp-don't-fail rule
//!
//! Errors ([`ConfigError`]) surface from setup calls only - nothing here
//! runs on the audio thread.
//!
//! # Example
//!
//! ```rust
//! use voce_config::EngineConfig;
//! use voce_registry::CoreRegistry;
//!
//! let toml = r#"
//!     [engine]
//!     voice_mode = "mono"
//!
//!     [[oscillator]]
//!     core = "wavetable"
//! "#;
//! let config = EngineConfig::from_toml_str(toml).unwrap();
//! let engine = config.build_engine(CoreRegistry::with_builtins(), 48000.0).unwrap();
//! assert_eq!(engine.params().voice.oscillators[0].core_index, 1);
//! ```

pub mod engine_config;
pub mod error;
pub mod validation;

pub use engine_config::{
    DcaSection, DelaySection, EngineConfig, EngineSection, EnvelopeSection, FilterSection,
    LfoSection, OscillatorSection, RouteSection,
};
pub use error::ConfigError;
pub use validation::{clamp_usize_warn, clamp_warn, parse_mod_dest, parse_mod_source, parse_voice_mode};
