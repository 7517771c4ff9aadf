use crate::config::{env_parse, env_string};
use crate::http::{build_client, ensure_success, require_base_url, require_key, transport_error};
use crate::providers::PointOfInterest;
use crate::{Result, WaysideError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::{debug, warn};

use super::prompt::build_tour_prompt;

/// Configuration for NarrationClient loaded from environment variables
#[derive(Clone)]
pub struct NarrationConfig {
    pub base_url: String, // e.g., https://generativelanguage.googleapis.com
    pub model: String,    // e.g., gemini-2.0-flash
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            base_url: env_string("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
            model: env_string("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            api_key: env_string("GEMINI_API_KEY"),
            request_timeout_ms: env_parse("NARRATION_TIMEOUT_MS").unwrap_or(30_000),
        }
    }
}

impl fmt::Debug for NarrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

/// Generated tour commentary for one point of interest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationResult {
    pub text: String,
}

/// Seam the orchestrator uses to turn a point of interest into narration.
#[async_trait]
pub trait NarrationGenerator: Send + Sync {
    async fn generate_narration(&self, poi: &PointOfInterest) -> Result<NarrationResult>;
}

/// HTTP client for the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct NarrationClient {
    http: Client,
    cfg: NarrationConfig,
}

impl NarrationClient {
    pub fn new(cfg: NarrationConfig) -> Result<Self> {
        let http = build_client(cfg.request_timeout_ms)?;
        Ok(Self { http, cfg })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(NarrationConfig::default())
    }

    pub fn config(&self) -> &NarrationConfig {
        &self.cfg
    }
}

#[async_trait]
impl NarrationGenerator for NarrationClient {
    /// Single attempt, no retries; the next poll is the retry policy.
    async fn generate_narration(&self, poi: &PointOfInterest) -> Result<NarrationResult> {
        let key = require_key("Gemini", "GEMINI_API_KEY", &self.cfg.api_key)?;
        let base = require_base_url("Gemini", &self.cfg.base_url)?;
        let url = format!("{}/v1beta/models/{}:generateContent", base, self.cfg.model);

        debug!(target: "narration", poi = %poi.name, model = %self.cfg.model, "POST generateContent");

        let body = json!({
            "contents": [
                { "parts": [ { "text": build_tour_prompt(poi) } ] }
            ]
        });

        let resp = self
            .http
            .post(&url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "narration", error = %e, "generateContent request failed");
                transport_error("Gemini", e)
            })?;
        let resp = ensure_success("Gemini", resp).await?;

        let val: serde_json::Value = resp.json().await.map_err(|e| {
            WaysideError::DecodeError(format!("Failed to parse generateContent JSON: {e}"))
        })?;
        let text = extract_text_from_candidates(&val).ok_or_else(|| {
            WaysideError::DecodeError(
                "Missing candidates[0].content.parts[0].text in generateContent response".into(),
            )
        })?;

        debug!(target: "narration", poi = %poi.name, chars = text.chars().count(), "Narration generated");
        Ok(NarrationResult { text })
    }
}

fn extract_text_from_candidates(v: &serde_json::Value) -> Option<String> {
    v.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
