// Wayside Core Library
// Location-driven tour narration: places lookup -> narration -> speech -> playback

pub mod audio;
pub mod config;
pub mod geo;
pub mod llm;
pub mod orchestrator;
pub mod providers;
pub mod tts;

pub(crate) mod http;

// Export core types
pub use audio::{AudioBlob, AudioPlayer, PlaybackOutcome, PlaybackTicket, ProcessPlayer};
pub use config::{PollInterval, SearchRadius, TourSettings};
pub use geo::{Coordinate, Placemark, PositionFix, PositionTracker};
pub use llm::{NarrationClient, NarrationConfig, NarrationGenerator, NarrationResult};
pub use orchestrator::{OrchestratorState, PlaybackPhase, StateStore, TourOrchestrator};
pub use providers::{
    is_same_poi, PhotoRef, PlaceLookup, PlacesClient, PlacesConfig, PoiKey, PointOfInterest,
};
pub use tts::{SpeechCacheEntry, SpeechClient, SpeechConfig, SpeechSynthesizer};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaysideError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Empty input: {0}")]
    EmptyInputError(String),

    #[error("Playback error: {0}")]
    PlaybackError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl WaysideError {
    /// Transient failures that the next poll will retry on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WaysideError::NetworkError(_) | WaysideError::DecodeError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WaysideError>;
