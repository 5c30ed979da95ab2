//! Token client: OAuth2 client-credentials exchange.
//!
//! A fresh token is fetched for every job. Tokens are short-lived and a
//! report only runs two jobs, so there is no cache to invalidate.

use crate::config::ServiceConfig;
use crate::error::ReportError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Exchange the configured client credentials for a bearer token.
pub async fn fetch_access_token(
    http: &reqwest::Client,
    config: &ServiceConfig,
) -> Result<String, ReportError> {
    let url = config.auth_url.as_str();
    let fail = |detail: String| {
        warn!("Token request failed: {detail}");
        ReportError::AuthenticationFailed {
            url: url.to_string(),
            detail,
        }
    };

    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];

    let response = http
        .post(url)
        .form(&form)
        .timeout(Duration::from_secs(config.auth_timeout_secs))
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fail(format!("HTTP {status}")));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| fail(format!("unreadable token response: {e}")))?;

    match body.access_token {
        Some(token) if !token.is_empty() => {
            debug!("Obtained access token ({} chars)", token.len());
            Ok(token)
        }
        _ => Err(fail("response contained no access_token".into())),
    }
}
