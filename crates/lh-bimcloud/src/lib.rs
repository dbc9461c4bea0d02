//! # lh-bimcloud
//!
//! HTTP client for the BIMcloud management API.
//!
//! The client starts unauthenticated. [`BimCloudClient::connect`] performs an
//! OAuth2 password grant and keeps the bearer token for the rest of the
//! process; there is no expiry tracking or refresh. Resource queries take a
//! [`Criterion`] tree and default to projects and libraries.

mod error;
mod http;

pub use error::BimCloudError;
pub use http::AccessToken;

use std::time::Duration;

use lh_config::ServerConfig;
use lh_core::{Criterion, ResourceRecord};

/// Token endpoint, relative to the server base url.
pub const TOKEN_PATH: &str = "/management/client/oauth2/token";
/// Resource query endpoint, relative to the server base url.
pub const RESOURCES_PATH: &str = "/management/client/get-resources-by-criterion";

enum Session {
    Unauthenticated,
    Authenticated(AccessToken),
}

/// BIMcloud management API client.
pub struct BimCloudClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    session: Session,
}

impl BimCloudClient {
    /// Create an unauthenticated client for `server`.
    ///
    /// # Errors
    ///
    /// Returns [`BimCloudError::Http`] if the underlying `reqwest::Client`
    /// fails to build.
    pub fn new(server: &ServerConfig) -> Result<Self, BimCloudError> {
        let http = reqwest::Client::builder()
            .user_agent("lakehouse/0.1")
            .timeout(Duration::from_secs(server.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: server.base_url(),
            client_id: server.client.clone(),
            session: Session::Unauthenticated,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.session, Session::Authenticated(_))
    }

    /// Authenticate with a password grant.
    ///
    /// # Errors
    ///
    /// - [`BimCloudError::MissingCredentials`] if `user` or `password` is empty
    ///   (checked before any network traffic)
    /// - [`BimCloudError::AuthenticationFailed`] on transport errors, non-2xx
    ///   responses, or an undecodable token body
    pub async fn connect(&mut self, user: &str, password: &str) -> Result<(), BimCloudError> {
        if user.is_empty() || password.is_empty() {
            return Err(BimCloudError::MissingCredentials {
                url: self.base_url.clone(),
            });
        }

        let url = format!("{}{TOKEN_PATH}", self.base_url);
        let form = [
            ("grant_type", "password"),
            ("username", user),
            ("password", password),
            ("client_id", self.client_id.as_str()),
        ];
        let resp = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| BimCloudError::AuthenticationFailed {
                url: self.base_url.clone(),
                reason: e.to_string(),
            })?;

        let token = http::decode_token(resp, &self.base_url).await?;
        self.session = Session::Authenticated(token);
        tracing::info!(server = %self.base_url, user, "connected to BIMcloud");
        Ok(())
    }

    /// Query resources matching `criterion` (projects and libraries when `None`).
    ///
    /// # Errors
    ///
    /// - [`BimCloudError::NotAuthenticated`] before a successful `connect`
    /// - [`BimCloudError::FetchFailed`] on a non-2xx response
    /// - [`BimCloudError::Http`] / [`BimCloudError::Parse`] on transport or
    ///   decoding failures
    pub async fn fetch_resources(
        &self,
        criterion: Option<&Criterion>,
    ) -> Result<Vec<ResourceRecord>, BimCloudError> {
        let Session::Authenticated(token) = &self.session else {
            return Err(BimCloudError::NotAuthenticated);
        };

        let default_criterion;
        let criterion = if let Some(criterion) = criterion {
            criterion
        } else {
            default_criterion = Criterion::default_types();
            &default_criterion
        };

        let url = format!("{}{RESOURCES_PATH}", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token.access_token)
            .json(criterion)
            .send()
            .await?;

        let resources = http::decode_resources(resp).await?;
        tracing::debug!(count = resources.len(), "fetched resources");
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ServerConfig {
        ServerConfig {
            // Reserved TEST-NET address: nothing should ever answer here.
            url: "http://192.0.2.1".into(),
            port: 22000,
            client: "TeamClient".into(),
            timeout_secs: 1,
        }
    }

    #[test]
    fn new_client_is_unauthenticated() {
        let client = BimCloudClient::new(&server()).unwrap();
        assert!(!client.is_authenticated());
        assert_eq!(client.base_url(), "http://192.0.2.1:22000");
    }

    #[tokio::test]
    async fn connect_requires_user() {
        let mut client = BimCloudClient::new(&server()).unwrap();
        let err = client.connect("", "secret").await.unwrap_err();
        assert!(matches!(err, BimCloudError::MissingCredentials { .. }));
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn connect_requires_password() {
        let mut client = BimCloudClient::new(&server()).unwrap();
        let err = client.connect("alice", "").await.unwrap_err();
        assert!(matches!(err, BimCloudError::MissingCredentials { .. }));
    }

    #[tokio::test]
    async fn fetch_before_connect_is_rejected() {
        let client = BimCloudClient::new(&server()).unwrap();
        let err = client.fetch_resources(None).await.unwrap_err();
        assert!(matches!(err, BimCloudError::NotAuthenticated));
    }
}
