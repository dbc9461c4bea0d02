//! Runner error types.

use std::path::PathBuf;

use lh_bimcloud::BimCloudError;
use lh_config::ConfigError;
use lh_core::CoreError;
use lh_lake::LakeError;

/// Errors raised while discovering or dispatching scripts.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Scripts directory not found: {}", path.display())]
    ScriptsDirectoryNotFound { path: PathBuf },

    #[error("Script '{0}' not found")]
    ScriptNotFound(String),

    #[error("Script '{script}' has no entry '{entry}'")]
    EntryNotFound { script: String, entry: String },

    /// The entry exists but is an exposed constant.
    #[error("'{script}.{entry}' is not callable")]
    NotCallable { script: String, entry: String },

    /// The caller passed a parameter the dispatcher supplies itself.
    #[error("Parameter '{0}' is reserved and cannot be passed by the caller")]
    ReservedParameter(String),

    /// Loading the script configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The entry ran and failed.
    #[error("'{script}.{entry}' failed")]
    Script {
        script: String,
        entry: String,
        #[source]
        source: ScriptError,
    },
}

/// Errors returned by script entries.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    BimCloud(#[from] BimCloudError),

    #[error(transparent)]
    Lake(#[from] LakeError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// An entry result could not be turned into JSON.
    #[error("Failed to serialize result: {0}")]
    Output(#[from] serde_json::Error),

    /// The tracking file exists but could not be read or written.
    #[error("Tracking file {}: {source}", path.display())]
    Tracking {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tracking file is not valid tracking JSON.
    #[error("Malformed tracking file {}: {source}", path.display())]
    TrackingFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
