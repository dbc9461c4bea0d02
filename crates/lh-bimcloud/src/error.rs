//! BIMcloud client error types.

use thiserror::Error;

/// Errors that can occur when talking to the BIMcloud management API.
#[derive(Debug, Error)]
pub enum BimCloudError {
    /// User or password was not supplied.
    #[error("no auth credentials for {url}")]
    MissingCredentials {
        /// Server the credentials were meant for.
        url: String,
    },

    /// The token endpoint rejected the request or returned an unusable body.
    #[error("failed to authenticate against {url}: {reason}")]
    AuthenticationFailed {
        /// Server that was contacted.
        url: String,
        /// Transport error, status, or decoding failure.
        reason: String,
    },

    /// A query was attempted before [`connect`](crate::BimCloudClient::connect) succeeded.
    #[error("not authenticated, call connect() first")]
    NotAuthenticated,

    /// The resource query returned a non-success status code.
    #[error("resource query failed ({status}): {message}")]
    FetchFailed {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// HTTP transport error on a query.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to decode a response body.
    #[error("parse error: {0}")]
    Parse(String),
}
