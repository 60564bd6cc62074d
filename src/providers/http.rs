//! Shared request/response plumbing for the provider clients.

use reqwest::header::HeaderValue;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::error::{RelayError, Result};
use crate::providers::traits::ProviderId;

/// Send a prepared request and decode a JSON body, turning non-2xx answers
/// into `ProviderApi` errors carrying the response text.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: ProviderId,
    request: RequestBuilder,
) -> Result<T> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(RelayError::ProviderApi {
            provider: provider.to_string(),
            message: error_text,
            status: Some(status.as_u16()),
        });
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| RelayError::ProviderResponse {
        provider: provider.to_string(),
        reason: e.to_string(),
    })
}

/// Reject keys that can never authenticate: blank, or not sendable in a header.
pub(crate) fn validate_api_key(provider: ProviderId, api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(RelayError::ClientInit {
            provider: provider.to_string(),
            reason: "API key is empty".to_string(),
        });
    }

    if api_key.chars().any(char::is_whitespace) || HeaderValue::from_str(api_key).is_err() {
        return Err(RelayError::ClientInit {
            provider: provider.to_string(),
            reason: "API key contains characters not allowed in a header".to_string(),
        });
    }

    Ok(())
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
