//! Audio blob type and the playback seam.

use crate::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Synthesized audio plus the exact text it was derived from.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioBlob {
    data: Arc<[u8]>,
    source_text: Arc<str>,
    format: String,
}

impl AudioBlob {
    pub fn new(data: Vec<u8>, source_text: impl Into<String>, format: impl Into<String>) -> Self {
        let source_text: String = source_text.into();
        Self {
            data: data.into(),
            source_text: source_text.into(),
            format: format.into(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Container format, e.g. `mp3`; doubles as the file extension.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for AudioBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBlob")
            .field("bytes", &self.data.len())
            .field("format", &self.format)
            .field("source_chars", &self.source_text.chars().count())
            .finish()
    }
}

/// How a playback ended without being stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Failed(String),
}

type OutcomeFn = Box<dyn FnOnce(u64, PlaybackOutcome) + Send>;

/// Handed to the player with each `play`; completing it reports the outcome
/// back to whoever started the playback.
///
/// A ticket dropped without completion reports nothing, which is what a
/// stopped or replaced playback should do.
pub struct PlaybackTicket {
    id: u64,
    on_outcome: Option<OutcomeFn>,
}

impl PlaybackTicket {
    pub fn new(id: u64, on_outcome: impl FnOnce(u64, PlaybackOutcome) + Send + 'static) -> Self {
        Self {
            id,
            on_outcome: Some(Box::new(on_outcome)),
        }
    }

    /// Ticket that reports nowhere.
    pub fn detached(id: u64) -> Self {
        Self {
            id,
            on_outcome: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn finished(self) {
        self.complete(PlaybackOutcome::Finished);
    }

    pub fn failed(self, reason: impl Into<String>) {
        self.complete(PlaybackOutcome::Failed(reason.into()));
    }

    fn complete(mut self, outcome: PlaybackOutcome) {
        if let Some(f) = self.on_outcome.take() {
            f(self.id, outcome);
        }
    }
}

impl fmt::Debug for PlaybackTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackTicket")
            .field("id", &self.id)
            .field("attached", &self.on_outcome.is_some())
            .finish()
    }
}

/// Plays audio blobs. Implementations wrap the platform audio stack.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Starts `audio`, replacing whatever is playing. Natural completion or a
    /// mid-playback failure is reported through `ticket`.
    async fn play(&self, audio: AudioBlob, ticket: PlaybackTicket) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    /// Stops immediately; the current ticket is dropped unreported.
    async fn stop(&self) -> Result<()>;
}
