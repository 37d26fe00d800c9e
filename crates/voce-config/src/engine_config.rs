//! TOML-backed engine configuration.
//!
//! [`EngineConfig`] is the typed schema of a voce engine setup file. Every
//! field is optional; missing fields fall back to the engine defaults, so an
//! empty file is a valid (and audible) configuration. Core algorithms are
//! referenced by registry *name* and resolved to indices at build time -
//! a typo is a setup error, reported before any audio runs.
//!
//! ```toml
//! [engine]
//! voice_mode = "poly"
//! polyphony = 16
//!
//! [[oscillator]]
//! core = "va"
//! waveform = "Saw"
//!
//! [[oscillator]]
//! core = "wavetable"
//! waveform = "Square"
//! cents = 7.0
//!
//! [[filter]]
//! core = "ladder"
//! cutoff_hz = 900.0
//! resonance = 4.0
//!
//! [amp_eg]
//! attack_ms = 5.0
//! release_ms = 400.0
//!
//! [[route]]
//! source = "lfo1"
//! dest = "filter1_cutoff"
//! intensity = 0.4
//! ```

use serde::Deserialize;
use std::path::Path;

use voce_core::{FilterKind, LfoMode, LfoShape, NoteDivision, OscWaveform};
use voce_registry::{CoreRegistry, ModuleFamily};
use voce_synth::{EngineParams, MAX_POLYPHONY, SynthEngine};
use voce_synth::{NUM_FILTERS, NUM_LFOS, NUM_OSCILLATORS};

use crate::error::ConfigError;
use crate::validation::{
    clamp_usize_warn, clamp_warn, parse_mod_dest, parse_mod_source, parse_voice_mode,
};

/// `[engine]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Voice allocation policy: `poly`, `mono`, `legato`, `unison`,
    /// `unison-legato`.
    pub voice_mode: Option<String>,
    /// Voice pool size, 1..=32. Construction-time.
    pub polyphony: Option<usize>,
    /// Engine block size in frames, 1..=128. Construction-time.
    pub block_size: Option<usize>,
    /// Master volume in dB.
    pub master_volume_db: Option<f32>,
    /// Master tuning in cents.
    pub master_tune_cents: Option<f32>,
    /// Pitch-bend range in semitones.
    pub pitch_bend_range: Option<f32>,
    /// Voices stacked per note in unison modes.
    pub unison_voices: Option<usize>,
    /// Total unison detune spread in cents.
    pub unison_detune_cents: Option<f32>,
    /// Unison stereo spread, 0..=1.
    pub unison_stereo_spread: Option<f32>,
    /// Glide time in milliseconds for glide-enabled modes.
    pub glide_time_ms: Option<f32>,
}

/// One `[[oscillator]]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OscillatorSection {
    /// Core name in the registry (e.g. `va`, `wavetable`).
    pub core: Option<String>,
    /// Enable this slot.
    pub enabled: Option<bool>,
    /// Waveform variant name (e.g. `Saw`).
    pub waveform: Option<OscWaveform>,
    /// Coarse tune in octaves.
    pub octave: Option<i32>,
    /// Coarse tune in semitones.
    pub semitones: Option<i32>,
    /// Fine tune in cents.
    pub cents: Option<f32>,
    /// Output level, 0..=1.
    pub level: Option<f32>,
    /// Pulse width for pulse waveforms.
    pub pulse_width: Option<f32>,
    /// Full-scale pitch-modulation range in semitones.
    pub pitch_mod_range: Option<f32>,
    /// Core-defined mod knobs A-D.
    pub mod_knobs: Option<[f32; 4]>,
}

/// One `[[filter]]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    /// Core name in the registry (e.g. `svf`, `ladder`).
    pub core: Option<String>,
    /// Enable this slot.
    pub enabled: Option<bool>,
    /// Response variant name (e.g. `Lowpass`).
    pub kind: Option<FilterKind>,
    /// Base cutoff in Hz.
    pub cutoff_hz: Option<f32>,
    /// Resonance (Q).
    pub resonance: Option<f32>,
    /// Nonlinear drive, 0..=1.
    pub drive: Option<f32>,
    /// Keyboard tracking, 0..=1.
    pub key_track: Option<f32>,
    /// Bipolar cutoff-modulation range in semitones.
    pub mod_range: Option<f32>,
    /// EG-route cutoff-modulation range in semitones.
    pub eg_mod_range: Option<f32>,
}

/// `[amp_eg]` / `[filter_eg]` / `[aux_eg]` sections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvelopeSection {
    /// Core name in the registry (e.g. `analog`, `linear`).
    pub core: Option<String>,
    /// Attack time in milliseconds.
    pub attack_ms: Option<f32>,
    /// Decay time in milliseconds.
    pub decay_ms: Option<f32>,
    /// Sustain level, 0..=1.
    pub sustain: Option<f32>,
    /// Release time in milliseconds.
    pub release_ms: Option<f32>,
    /// Core-defined mod knobs A-D (knob A = attack start level).
    pub mod_knobs: Option<[f32; 4]>,
}

/// One `[[lfo]]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LfoSection {
    /// Core name in the registry (e.g. `classic`).
    pub core: Option<String>,
    /// Waveform variant name (e.g. `Triangle`).
    pub shape: Option<LfoShape>,
    /// Phase behavior variant name (`Free` or `Retrigger`).
    pub mode: Option<LfoMode>,
    /// Rate in Hz.
    pub rate_hz: Option<f32>,
    /// Output depth, 0..=1.
    pub depth: Option<f32>,
    /// Sync the rate to the host tempo.
    pub tempo_sync: Option<bool>,
    /// Note division when synced (e.g. `Quarter`).
    pub division: Option<NoteDivision>,
    /// Core-defined mod knobs A-D.
    pub mod_knobs: Option<[f32; 4]>,
}

/// `[dca]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DcaSection {
    /// Static gain in dB.
    pub gain_db: Option<f32>,
    /// Pan, -1..=1.
    pub pan: Option<f32>,
    /// Velocity sensitivity, 0..=1.
    pub velocity_sensitivity: Option<f32>,
}

/// `[delay]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DelaySection {
    /// Put the delay in the signal path.
    pub enabled: Option<bool>,
    /// Delay time in milliseconds.
    pub time_ms: Option<f32>,
    /// Feedback, 0..=0.95.
    pub feedback: Option<f32>,
    /// Wet/dry mix, 0..=1.
    pub mix: Option<f32>,
    /// Cross-feed feedback between channels.
    pub ping_pong: Option<bool>,
    /// Derive the time from the host tempo.
    pub tempo_sync: Option<bool>,
    /// Note division when synced.
    pub division: Option<NoteDivision>,
}

/// One `[[route]]` section: an enabled modulation-matrix cell.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSection {
    /// Source name (`lfo1`, `lfo2`, `amp_eg`, `filter_eg`, `aux_eg`).
    pub source: String,
    /// Destination name (`osc1_pitch`, ..., `filter1_cutoff`,
    /// `filter1_eg_cutoff`, `amp_eg_retrigger`, `amplitude`, `pan`).
    pub dest: String,
    /// Cell intensity, -1..=1.
    #[serde(default = "default_route_intensity")]
    pub intensity: f32,
}

fn default_route_intensity() -> f32 {
    1.0
}

/// A complete engine setup file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `[engine]` section.
    pub engine: EngineSection,
    /// Oscillator slots, first section = slot 1. Extras beyond the slot
    /// count are ignored with a warning.
    pub oscillator: Vec<OscillatorSection>,
    /// Filter slots.
    pub filter: Vec<FilterSection>,
    /// Amplitude envelope.
    pub amp_eg: EnvelopeSection,
    /// Filter envelope.
    pub filter_eg: EnvelopeSection,
    /// Auxiliary envelope.
    pub aux_eg: EnvelopeSection,
    /// LFO slots.
    pub lfo: Vec<LfoSection>,
    /// Output stage.
    pub dca: DcaSection,
    /// Shared delay.
    pub delay: DelaySection,
    /// Modulation routes.
    pub route: Vec<RouteSection>,
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Load and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::read_file(path, source))?;
        tracing::info!(path = %path.display(), "loading engine configuration");
        Self::from_toml_str(&text)
    }

    /// Resolve the configuration into an [`EngineParams`] snapshot.
    ///
    /// Core names resolve through `registry`; an unknown name is a hard
    /// error (setup-time typo), while out-of-range numerics clamp with a
    /// warning.
    pub fn to_engine_params(&self, registry: &CoreRegistry) -> Result<EngineParams, ConfigError> {
        let mut params = EngineParams::default();

        let e = &self.engine;
        if let Some(mode) = &e.voice_mode {
            params.voice_mode = parse_voice_mode(mode)?;
        }
        if let Some(v) = e.master_volume_db {
            params.master_volume_db = clamp_warn("engine.master_volume_db", v, -60.0, 12.0);
        }
        if let Some(v) = e.master_tune_cents {
            params.master_tune_cents = clamp_warn("engine.master_tune_cents", v, -100.0, 100.0);
        }
        if let Some(v) = e.pitch_bend_range {
            params.pitch_bend_range = clamp_warn("engine.pitch_bend_range", v, 0.0, 24.0);
        }
        if let Some(v) = e.unison_voices {
            params.unison_voices = clamp_usize_warn("engine.unison_voices", v, 2, 8);
        }
        if let Some(v) = e.unison_detune_cents {
            params.unison_detune_cents = clamp_warn("engine.unison_detune_cents", v, 0.0, 100.0);
        }
        if let Some(v) = e.unison_stereo_spread {
            params.unison_stereo_spread = clamp_warn("engine.unison_stereo_spread", v, 0.0, 1.0);
        }
        if let Some(v) = e.glide_time_ms {
            params.voice.glide_time_ms = clamp_warn("engine.glide_time_ms", v, 0.0, 10_000.0);
        }

        if self.oscillator.len() > NUM_OSCILLATORS {
            tracing::warn!(
                given = self.oscillator.len(),
                slots = NUM_OSCILLATORS,
                "extra oscillator sections ignored"
            );
        }
        for (i, section) in self.oscillator.iter().take(NUM_OSCILLATORS).enumerate() {
            let p = &mut params.voice.oscillators[i];
            // A configured slot is audible unless it says otherwise.
            p.enabled = section.enabled.unwrap_or(true);
            if let Some(core) = &section.core {
                p.core_index = resolve(registry, ModuleFamily::Oscillator, "oscillator", core)?;
            }
            if let Some(v) = section.waveform {
                p.waveform = v;
            }
            if let Some(v) = section.octave {
                p.octave = v.clamp(-4, 4);
            }
            if let Some(v) = section.semitones {
                p.semitones = v.clamp(-12, 12);
            }
            if let Some(v) = section.cents {
                p.cents = clamp_warn("oscillator.cents", v, -100.0, 100.0);
            }
            if let Some(v) = section.level {
                p.level = clamp_warn("oscillator.level", v, 0.0, 1.0);
            }
            if let Some(v) = section.pulse_width {
                p.pulse_width = clamp_warn("oscillator.pulse_width", v, 0.02, 0.98);
            }
            if let Some(v) = section.pitch_mod_range {
                p.pitch_mod_range = clamp_warn("oscillator.pitch_mod_range", v, 0.0, 48.0);
            }
            if let Some(v) = section.mod_knobs {
                p.mod_knobs = v.map(|k| clamp_warn("oscillator.mod_knobs", k, 0.0, 1.0));
            }
        }

        if self.filter.len() > NUM_FILTERS {
            tracing::warn!(
                given = self.filter.len(),
                slots = NUM_FILTERS,
                "extra filter sections ignored"
            );
        }
        for (i, section) in self.filter.iter().take(NUM_FILTERS).enumerate() {
            let p = &mut params.voice.filters[i];
            p.enabled = section.enabled.unwrap_or(true);
            if let Some(core) = &section.core {
                p.core_index = resolve(registry, ModuleFamily::Filter, "filter", core)?;
            }
            if let Some(v) = section.kind {
                p.kind = v;
            }
            if let Some(v) = section.cutoff_hz {
                p.cutoff_hz = clamp_warn("filter.cutoff_hz", v, 20.0, 20480.0);
            }
            if let Some(v) = section.resonance {
                p.resonance = clamp_warn("filter.resonance", v, 0.5, 20.0);
            }
            if let Some(v) = section.drive {
                p.drive = clamp_warn("filter.drive", v, 0.0, 1.0);
            }
            if let Some(v) = section.key_track {
                p.key_track = clamp_warn("filter.key_track", v, 0.0, 1.0);
            }
            if let Some(v) = section.mod_range {
                p.mod_range = clamp_warn("filter.mod_range", v, 0.0, 96.0);
            }
            if let Some(v) = section.eg_mod_range {
                p.eg_mod_range = clamp_warn("filter.eg_mod_range", v, 0.0, 96.0);
            }
        }

        apply_envelope(registry, &self.amp_eg, &mut params.voice.amp_eg)?;
        apply_envelope(registry, &self.filter_eg, &mut params.voice.filter_eg)?;
        apply_envelope(registry, &self.aux_eg, &mut params.voice.aux_eg)?;

        if self.lfo.len() > NUM_LFOS {
            tracing::warn!(
                given = self.lfo.len(),
                slots = NUM_LFOS,
                "extra lfo sections ignored"
            );
        }
        for (i, section) in self.lfo.iter().take(NUM_LFOS).enumerate() {
            let p = &mut params.voice.lfos[i];
            if let Some(core) = &section.core {
                p.core_index = resolve(registry, ModuleFamily::Lfo, "lfo", core)?;
            }
            if let Some(v) = section.shape {
                p.shape = v;
            }
            if let Some(v) = section.mode {
                p.mode = v;
            }
            if let Some(v) = section.rate_hz {
                p.rate_hz = clamp_warn("lfo.rate_hz", v, 0.02, 20.0);
            }
            if let Some(v) = section.depth {
                p.depth = clamp_warn("lfo.depth", v, 0.0, 1.0);
            }
            if let Some(v) = section.tempo_sync {
                p.tempo_sync = v;
            }
            if let Some(v) = section.division {
                p.division = v;
            }
            if let Some(v) = section.mod_knobs {
                p.mod_knobs = v.map(|k| clamp_warn("lfo.mod_knobs", k, 0.0, 1.0));
            }
        }

        if let Some(v) = self.dca.gain_db {
            params.voice.dca.gain_db = clamp_warn("dca.gain_db", v, -60.0, 12.0);
        }
        if let Some(v) = self.dca.pan {
            params.voice.dca.pan = clamp_warn("dca.pan", v, -1.0, 1.0);
        }
        if let Some(v) = self.dca.velocity_sensitivity {
            params.voice.dca.velocity_sensitivity =
                clamp_warn("dca.velocity_sensitivity", v, 0.0, 1.0);
        }

        if let Some(v) = self.delay.enabled {
            params.delay.enabled = v;
        }
        if let Some(v) = self.delay.time_ms {
            params.delay.time_ms = clamp_warn("delay.time_ms", v, 1.0, 2000.0);
        }
        if let Some(v) = self.delay.feedback {
            params.delay.feedback = clamp_warn("delay.feedback", v, 0.0, 0.95);
        }
        if let Some(v) = self.delay.mix {
            params.delay.mix = clamp_warn("delay.mix", v, 0.0, 1.0);
        }
        if let Some(v) = self.delay.ping_pong {
            params.delay.ping_pong = v;
        }
        if let Some(v) = self.delay.tempo_sync {
            params.delay.tempo_sync = v;
        }
        if let Some(v) = self.delay.division {
            params.delay.division = v;
        }

        for route in &self.route {
            let source = parse_mod_source(&route.source)?;
            let dest = parse_mod_dest(&route.dest)?;
            let intensity = clamp_warn("route.intensity", route.intensity, -1.0, 1.0);
            params.voice.matrix.route(source, dest, intensity);
        }

        Ok(params)
    }

    /// Build a ready-to-use engine from this configuration.
    ///
    /// Resolves the parameter snapshot, constructs the engine with the
    /// configured polyphony and block size, and applies the snapshot.
    pub fn build_engine(
        &self,
        registry: CoreRegistry,
        sample_rate: f32,
    ) -> Result<SynthEngine, ConfigError> {
        let params = self.to_engine_params(&registry)?;
        let polyphony = clamp_usize_warn(
            "engine.polyphony",
            self.engine.polyphony.unwrap_or(16),
            1,
            MAX_POLYPHONY,
        );
        let block_size = clamp_usize_warn(
            "engine.block_size",
            self.engine.block_size.unwrap_or(64),
            1,
            voce_synth::MAX_BLOCK_FRAMES,
        );
        let mut engine = SynthEngine::new(registry, sample_rate, block_size, polyphony);
        engine.set_parameters(&params);
        tracing::info!(
            polyphony,
            block_size,
            sample_rate,
            "engine built from configuration"
        );
        Ok(engine)
    }
}

fn resolve(
    registry: &CoreRegistry,
    family: ModuleFamily,
    family_name: &'static str,
    core: &str,
) -> Result<usize, ConfigError> {
    registry
        .index_of(family, core)
        .ok_or_else(|| ConfigError::UnknownCore {
            family: family_name,
            name: core.to_string(),
        })
}

fn apply_envelope(
    registry: &CoreRegistry,
    section: &EnvelopeSection,
    p: &mut voce_core::EnvelopeParams,
) -> Result<(), ConfigError> {
    if let Some(core) = &section.core {
        p.core_index = resolve(registry, ModuleFamily::Envelope, "envelope", core)?;
    }
    if let Some(v) = section.attack_ms {
        p.attack_ms = clamp_warn("eg.attack_ms", v, 0.1, 10_000.0);
    }
    if let Some(v) = section.decay_ms {
        p.decay_ms = clamp_warn("eg.decay_ms", v, 0.1, 10_000.0);
    }
    if let Some(v) = section.sustain {
        p.sustain = clamp_warn("eg.sustain", v, 0.0, 1.0);
    }
    if let Some(v) = section.release_ms {
        p.release_ms = clamp_warn("eg.release_ms", v, 0.1, 10_000.0);
    }
    if let Some(v) = section.mod_knobs {
        p.mod_knobs = v.map(|k| clamp_warn("eg.mod_knobs", k, 0.0, 1.0));
    }
    Ok(())
}
