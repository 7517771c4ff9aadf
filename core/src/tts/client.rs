use crate::audio::AudioBlob;
use crate::config::{env_parse, env_string, DEFAULT_VOICE};
use crate::http::{build_client, ensure_success, require_base_url, require_key, transport_error};
use crate::{Result, WaysideError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Voice-model parameters pinned for reproducible output.
pub const SPEECH_MODEL: &str = "blizzard";
pub const SPEECH_FORMAT: &str = "mp3";
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
pub const SPEECH_SEED: u64 = 42;
pub const SPEECH_TOP_P: f32 = 0.3;
pub const SPEECH_TEMPERATURE: f32 = 0.3;

#[derive(Clone)]
pub struct SpeechConfig {
    pub base_url: String, // e.g., https://api.lmnt.com
    pub api_key: Option<String>,
    pub default_voice: String,
    pub request_timeout_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: env_string("LMNT_BASE_URL")
                .unwrap_or_else(|| "https://api.lmnt.com".to_string()),
            api_key: env_string("LMNT_API_KEY"),
            default_voice: env_string("LMNT_VOICE").unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            request_timeout_ms: env_parse("SPEECH_TIMEOUT_MS").unwrap_or(30_000),
        }
    }
}

impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("default_voice", &self.default_voice)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

/// The single cached synthesis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCacheEntry {
    pub source_text: String,
    pub audio: AudioBlob,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    voice: &'a str,
    text: &'a str,
    model: &'static str,
    language: &'static str,
    format: &'static str,
    sample_rate: u32,
    seed: u64,
    top_p: f32,
    temperature: f32,
}

/// Seam the orchestrator uses to turn narration into audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioBlob>;
}

/// LMNT speech client with a one-entry cache keyed by exact text.
///
/// Only the current narration ever needs replaying, so a new distinct text
/// always evicts the previous entry. The slot is replaced on success only.
pub struct SpeechClient {
    http: Client,
    cfg: SpeechConfig,
    cache: Mutex<Option<SpeechCacheEntry>>,
}

impl SpeechClient {
    pub fn new(cfg: SpeechConfig) -> Result<Self> {
        let http = build_client(cfg.request_timeout_ms)?;
        Ok(Self {
            http,
            cfg,
            cache: Mutex::new(None),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(SpeechConfig::default())
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.cfg
    }

    /// Source text of the cached entry, if any.
    pub async fn cached_text(&self) -> Option<String> {
        self.cache
            .lock()
            .await
            .as_ref()
            .map(|e| e.source_text.clone())
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.take();
    }

    async fn request_audio(&self, text: &str, voice: &str) -> Result<AudioBlob> {
        let key = require_key("LMNT", "LMNT_API_KEY", &self.cfg.api_key)?;
        let base = require_base_url("LMNT", &self.cfg.base_url)?;
        let url = format!("{}/v1/ai/speech/bytes", base);

        let body = SpeechRequest {
            voice,
            text,
            model: SPEECH_MODEL,
            language: "auto",
            format: SPEECH_FORMAT,
            sample_rate: SPEECH_SAMPLE_RATE,
            seed: SPEECH_SEED,
            top_p: SPEECH_TOP_P,
            temperature: SPEECH_TEMPERATURE,
        };

        debug!(target: "speech", voice = %voice, chars = text.chars().count(), "POST {}", url);

        let resp = self
            .http
            .post(&url)
            .header("X-API-Key", key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "speech", error = %e, "Speech request failed");
                transport_error("LMNT", e)
            })?;
        let resp = ensure_success("LMNT", resp).await?;

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| WaysideError::NetworkError(format!("Failed to read audio body: {e}")))?;
        if bytes.is_empty() {
            return Err(WaysideError::DecodeError(
                "No audio data received".to_string(),
            ));
        }
        Ok(AudioBlob::new(bytes.to_vec(), text, SPEECH_FORMAT))
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechClient {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioBlob> {
        if text.is_empty() {
            return Err(WaysideError::EmptyInputError(
                "narration text is empty".to_string(),
            ));
        }
        let voice = if voice.trim().is_empty() {
            self.cfg.default_voice.as_str()
        } else {
            voice
        };

        // Held across the request so synthesis calls never interleave on the slot.
        let mut slot = self.cache.lock().await;
        if let Some(entry) = slot.as_ref() {
            if entry.source_text == text {
                debug!(target: "speech", bytes = entry.audio.len(), "Using cached audio");
                return Ok(entry.audio.clone());
            }
        }

        let audio = self.request_audio(text, voice).await?;
        info!(target: "speech", bytes = audio.len(), voice = %voice, "Synthesized narration audio");
        *slot = Some(SpeechCacheEntry {
            source_text: text.to_string(),
            audio: audio.clone(),
        });
        Ok(audio)
    }
}
