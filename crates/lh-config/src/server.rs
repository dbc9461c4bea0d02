//! Remote BIMcloud server configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default request timeout.
const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Scheme and host, e.g. `https://bimcloud.example.com`.
    pub url: String,

    /// Management API port.
    pub port: u16,

    /// OAuth2 `client_id` sent with the password grant.
    pub client: String,

    /// Per-request timeout for authentication and queries.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ServerConfig {
    /// `<url>:<port>`, without a trailing slash on `url`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.url.trim_end_matches('/'), self.port)
    }

    /// Reject values that deserialize fine but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an empty url or client id,
    /// a url without an `http(s)://` scheme, or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "server.url".into(),
                reason: format!("'{}' is not an http(s) url", self.url),
            });
        }
        if self.client.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.client".into(),
                reason: "client id must not be empty".into(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_secs".into(),
                reason: "timeout must be at least one second".into(),
            });
        }
        Ok(())
    }
}
