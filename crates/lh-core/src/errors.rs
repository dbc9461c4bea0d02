//! Cross-cutting error types for Lakehouse.
//!
//! Domain-specific errors (e.g., `ConfigError`, `LakeError`) are defined in
//! their respective crates. They converge into `anyhow` in `lh-cli`.

use thiserror::Error;

/// Errors that can be raised by any Lakehouse crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A criterion document could not be parsed into an expression tree.
    #[error("Invalid criterion: {0}")]
    InvalidCriterion(String),

    /// A timestamp string or epoch value could not be interpreted.
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
