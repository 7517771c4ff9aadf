//! Shared HTTP plumbing for the provider clients.
//!
//! Every client maps transport and status failures through here so the
//! orchestrator sees one error taxonomy regardless of provider.

use crate::{Result, WaysideError};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

pub(crate) const USER_AGENT: &str = "wayside/0.1";

pub(crate) fn build_client(timeout_ms: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| WaysideError::ConfigError(format!("Failed to build HTTP client: {e}")))
}

/// Returns the configured key or a `ConfigError` naming the variable to set.
pub(crate) fn require_key<'a>(
    service: &str,
    env_key: &str,
    key: &'a Option<String>,
) -> Result<&'a str> {
    match key.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => Ok(k),
        _ => Err(WaysideError::ConfigError(format!(
            "{service} API key is not configured (set {env_key})"
        ))),
    }
}

pub(crate) fn require_base_url<'a>(service: &str, base_url: &'a str) -> Result<&'a str> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(WaysideError::ConfigError(format!(
            "{service} endpoint is not configured"
        )));
    }
    Ok(trimmed)
}

pub(crate) fn transport_error(service: &str, err: reqwest::Error) -> WaysideError {
    if err.is_timeout() {
        WaysideError::NetworkError(format!("{service} request timed out: {err}"))
    } else {
        WaysideError::NetworkError(format!("{service} request failed: {err}"))
    }
}

pub(crate) fn status_error(service: &str, status: StatusCode, body: &str) -> WaysideError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => WaysideError::ConfigError(format!(
            "{service} rejected credentials: status={status} body={body}"
        )),
        _ => WaysideError::NetworkError(format!(
            "{service} error: status={status} body={body}"
        )),
    }
}

/// Passes 2xx responses through, converts anything else into a typed error.
pub(crate) async fn ensure_success(service: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(service, status, &body))
}
