//! Error types for configuration operations.
//!
//! These surface only from setup-time calls (file loading, name
//! resolution); the rendering core never returns them. An out-of-range
//! numeric value is not an error - it is clamped with a warning (see
//! `validation`), because a config file must not be able to stop audio.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or resolving a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A core name that no registry entry matches
    #[error("unknown {family} core: '{name}'")]
    UnknownCore {
        /// Module family the lookup ran against.
        family: &'static str,
        /// The name that failed to resolve.
        name: String,
    },

    /// An enumeration field with an unrecognized value
    #[error("unknown value '{value}' for {field}")]
    UnknownName {
        /// Configuration field.
        field: &'static str,
        /// The unrecognized value.
        value: String,
    },
}

impl ConfigError {
    /// Create a read-file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }
}
