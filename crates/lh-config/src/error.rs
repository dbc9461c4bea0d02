//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment extraction or merge error (malformed JSON, missing required field, wrong type).
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// The configuration file for a scope does not exist.
    #[error("Configuration file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// A dotted field path is not defined in a loaded document.
    #[error("Attribute '{path}' not found in {}", file.display())]
    AttributeNotFound { path: String, file: PathBuf },

    /// A required configuration section is not configured.
    #[error("Configuration section '{section}' is not configured (missing required fields)")]
    NotConfigured { section: String },

    /// A configuration field has an invalid value.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// The file exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
