//! Text-to-Speech (TTS) client
//!
//! Synthesizes narration through the LMNT `speech/bytes` endpoint with fixed
//! voice-model parameters (seed, temperature, top-p, sample rate, mp3 output)
//! so the same text always produces comparable audio.
//!
//! Env overrides:
//! - LMNT_API_KEY, LMNT_BASE_URL, LMNT_VOICE
//! - SPEECH_TIMEOUT_MS

mod client;

pub use client::{
    SpeechCacheEntry, SpeechClient, SpeechConfig, SpeechSynthesizer, SPEECH_FORMAT, SPEECH_MODEL,
    SPEECH_SAMPLE_RATE, SPEECH_SEED, SPEECH_TEMPERATURE, SPEECH_TOP_P,
};
