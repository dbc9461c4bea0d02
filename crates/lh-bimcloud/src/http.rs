//! Response helpers shared by the token and query calls.
//!
//! Keeps status checks and body decoding out of [`crate::BimCloudClient`] so
//! both can be exercised against canned responses.

use lh_core::ResourceRecord;
use serde::Deserialize;

use crate::error::BimCloudError;

/// Bearer token returned by the password grant.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Decode a token endpoint response.
///
/// Any non-success status, undecodable body, or empty `access_token` maps to
/// [`BimCloudError::AuthenticationFailed`].
pub async fn decode_token(
    resp: reqwest::Response,
    url: &str,
) -> Result<AccessToken, BimCloudError> {
    let failed = |reason: String| BimCloudError::AuthenticationFailed {
        url: url.to_string(),
        reason,
    };

    let status = resp.status();
    let body = resp
        .bytes()
        .await
        .map_err(|e| failed(format!("reading token response: {e}")))?;
    if !status.is_success() {
        return Err(failed(format!(
            "token endpoint returned {status}: {}",
            String::from_utf8_lossy(&body)
        )));
    }

    let token: AccessToken = serde_json::from_slice(&body)
        .map_err(|e| failed(format!("failed to decode authentication response: {e}")))?;
    if token.access_token.is_empty() {
        return Err(failed("token response has an empty access_token".into()));
    }
    Ok(token)
}

/// Check a query response status, surfacing failures as
/// [`BimCloudError::FetchFailed`].
pub async fn check_response(
    resp: reqwest::Response,
) -> Result<reqwest::Response, BimCloudError> {
    if !resp.status().is_success() {
        return Err(BimCloudError::FetchFailed {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Decode a `get-resources-by-criterion` response.
pub async fn decode_resources(
    resp: reqwest::Response,
) -> Result<Vec<ResourceRecord>, BimCloudError> {
    let resp = check_response(resp).await?;
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| BimCloudError::Parse(e.to_string()))
}
