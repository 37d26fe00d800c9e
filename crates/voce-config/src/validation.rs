//! Range clamping and name resolution for configuration values.
//!
//! Numeric values outside their documented range are clamped with a
//! warning, never rejected - the engine applies the same policy at render
//! time, and a config file must not be able to stop audio. Names (voice
//! modes, matrix sources/destinations) are a closed set, so a miss there is
//! a typo and reported as a hard error.

use voce_core::VoiceMode;
use voce_synth::{ModDest, ModSource};

use crate::error::ConfigError;

/// Clamp `value` into `[min, max]`, logging when it actually moved.
pub fn clamp_warn(field: &'static str, value: f32, min: f32, max: f32) -> f32 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        tracing::warn!(field, value, min, max, "out-of-range value clamped");
    }
    clamped
}

/// Clamp an integer field the same way.
pub fn clamp_usize_warn(field: &'static str, value: usize, min: usize, max: usize) -> usize {
    let clamped = value.clamp(min, max);
    if clamped != value {
        tracing::warn!(field, value, min, max, "out-of-range value clamped");
    }
    clamped
}

/// Resolve a voice-mode name.
pub fn parse_voice_mode(value: &str) -> Result<VoiceMode, ConfigError> {
    match value {
        "poly" => Ok(VoiceMode::Poly),
        "mono" => Ok(VoiceMode::Mono),
        "legato" => Ok(VoiceMode::Legato),
        "unison" => Ok(VoiceMode::Unison),
        "unison-legato" => Ok(VoiceMode::UnisonLegato),
        other => Err(ConfigError::UnknownName {
            field: "engine.voice_mode",
            value: other.to_string(),
        }),
    }
}

/// Resolve a modulation-source name.
pub fn parse_mod_source(value: &str) -> Result<ModSource, ConfigError> {
    match value {
        "lfo1" => Ok(ModSource::Lfo1),
        "lfo2" => Ok(ModSource::Lfo2),
        "amp_eg" => Ok(ModSource::AmpEg),
        "filter_eg" => Ok(ModSource::FilterEg),
        "aux_eg" => Ok(ModSource::AuxEg),
        other => Err(ConfigError::UnknownName {
            field: "route.source",
            value: other.to_string(),
        }),
    }
}

/// Resolve a modulation-destination name.
pub fn parse_mod_dest(value: &str) -> Result<ModDest, ConfigError> {
    match value {
        "osc1_pitch" => Ok(ModDest::Osc1Pitch),
        "osc2_pitch" => Ok(ModDest::Osc2Pitch),
        "osc3_pitch" => Ok(ModDest::Osc3Pitch),
        "osc4_pitch" => Ok(ModDest::Osc4Pitch),
        "osc_shape" => Ok(ModDest::OscShape),
        "filter1_cutoff" => Ok(ModDest::Filter1Cutoff),
        "filter2_cutoff" => Ok(ModDest::Filter2Cutoff),
        "filter1_eg_cutoff" => Ok(ModDest::Filter1EgCutoff),
        "filter2_eg_cutoff" => Ok(ModDest::Filter2EgCutoff),
        "amp_eg_retrigger" => Ok(ModDest::AmpEgRetrigger),
        "amplitude" => Ok(ModDest::Amplitude),
        "pan" => Ok(ModDest::Pan),
        other => Err(ConfigError::UnknownName {
            field: "route.dest",
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_passes_in_range_values_through() {
        assert_eq!(clamp_warn("t", 0.5, 0.0, 1.0), 0.5);
        assert_eq!(clamp_warn("t", -3.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp_warn("t", 7.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp_usize_warn("t", 64, 1, 128), 64);
        assert_eq!(clamp_usize_warn("t", 0, 1, 128), 1);
    }

    #[test]
    fn voice_mode_names_resolve() {
        assert_eq!(parse_voice_mode("poly").unwrap(), VoiceMode::Poly);
        assert_eq!(
            parse_voice_mode("unison-legato").unwrap(),
            VoiceMode::UnisonLegato
        );
        assert!(parse_voice_mode("duophonic").is_err());
    }

    #[test]
    fn matrix_names_resolve() {
        assert_eq!(parse_mod_source("lfo1").unwrap(), ModSource::Lfo1);
        assert_eq!(parse_mod_source("aux_eg").unwrap(), ModSource::AuxEg);
        assert!(parse_mod_source("wheel").is_err());

        assert_eq!(parse_mod_dest("pan").unwrap(), ModDest::Pan);
        assert_eq!(
            parse_mod_dest("filter1_eg_cutoff").unwrap(),
            ModDest::Filter1EgCutoff
        );
        assert!(parse_mod_dest("volume").is_err());
    }
}
