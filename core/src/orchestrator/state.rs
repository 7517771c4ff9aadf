//! Observable orchestrator state and the store that publishes it.

use crate::providers::{PoiKey, PointOfInterest};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

/// Where the narration audio is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Speaking,
    Paused,
    /// Audio ended naturally; the narration stays visible and replayable.
    FinishedVisible,
}

impl fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlaybackPhase::Idle => "idle",
            PlaybackPhase::Speaking => "speaking",
            PlaybackPhase::Paused => "paused",
            PlaybackPhase::FinishedVisible => "finished",
        };
        f.write_str(s)
    }
}

/// Everything a presentation layer needs to render the tour.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestratorState {
    pub is_running: bool,
    pub current_poi_key: Option<PoiKey>,
    pub current_poi: Option<PointOfInterest>,
    pub is_loading_places: bool,
    pub is_loading_narration: bool,
    pub narration_text: String,
    pub narration_error: Option<String>,
    pub playback_phase: PlaybackPhase,
    pub playback_error: Option<String>,
    /// Latest lookup result, top-ranked first.
    pub places: Vec<PointOfInterest>,
    pub places_error: Option<String>,
    pub locality: Option<String>,
    pub last_poll_at: Option<DateTime<Utc>>,

    /// Bumped on every stop; completions carrying an older value are stale.
    #[serde(skip)]
    pub(crate) session: u64,
    /// Playback whose completion may still move the phase.
    #[serde(skip)]
    pub(crate) playback_id: u64,
}

impl OrchestratorState {
    pub fn is_speaking(&self) -> bool {
        self.playback_phase == PlaybackPhase::Speaking
    }

    /// Audio content is on screen: playing, paused or finished but replayable.
    pub fn is_audio_playing(&self) -> bool {
        matches!(
            self.playback_phase,
            PlaybackPhase::Speaking | PlaybackPhase::Paused | PlaybackPhase::FinishedVisible
        )
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading_places || self.is_loading_narration
    }

    pub fn error_message(&self) -> Option<&str> {
        self.narration_error
            .as_deref()
            .or(self.playback_error.as_deref())
            .or(self.places_error.as_deref())
    }

    /// Back to a fresh tour; everything in flight becomes stale.
    pub(crate) fn reset(&mut self) {
        let session = self.session.wrapping_add(1);
        let locality = self.locality.take();
        *self = OrchestratorState {
            session,
            locality,
            ..Default::default()
        };
    }
}

/// Single-writer reactive store for [`OrchestratorState`].
///
/// Readers take snapshots or subscribe to change notifications; every write
/// goes through a closure so check-and-apply happens atomically.
#[derive(Debug)]
pub struct StateStore {
    tx: watch::Sender<OrchestratorState>,
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(OrchestratorState::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> OrchestratorState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.tx.subscribe()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut OrchestratorState)) {
        self.tx.send_modify(f);
    }

    /// Applies `f`, notifying subscribers only when it reports a change.
    pub(crate) fn update_if(&self, f: impl FnOnce(&mut OrchestratorState) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    /// Applies `f` only while `session` is still current.
    pub(crate) fn update_in_session(
        &self,
        session: u64,
        f: impl FnOnce(&mut OrchestratorState),
    ) -> bool {
        self.update_if(|s| {
            if s.session != session {
                return false;
            }
            f(s);
            true
        })
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
