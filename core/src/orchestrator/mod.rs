//! Tour orchestrator
//!
//! Drives the poll → lookup → narration → synthesis → playback pipeline for
//! the latest known position and publishes an [`OrchestratorState`] that a
//! presentation layer can render without knowing any provider details.
//!
//! Invariants:
//! - At most one pipeline runs at a time. The "same point of interest" check
//!   happens after the pipeline guard is taken, so racing polls that resolve
//!   to one key issue a single narration and synthesis.
//! - Every completion is applied only if the tour session it started in is
//!   still current; `stop_tour` bumps the session so late results are dropped.
//! - Provider errors are recorded in state and never escape the poll loop.

mod state;

pub use state::{OrchestratorState, PlaybackPhase, StateStore};

use crate::audio::{AudioBlob, AudioPlayer, PlaybackOutcome, PlaybackTicket};
use crate::config::{PollInterval, SearchRadius, TourSettings};
use crate::geo::{Coordinate, PositionFix, PositionTracker};
use crate::llm::NarrationGenerator;
use crate::providers::{is_same_poi, PlaceLookup, PoiKey, PointOfInterest};
use crate::tts::SpeechSynthesizer;
use crate::{Result, WaysideError};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Coordinates the three provider clients and the audio player for one tour.
///
/// Cheap to clone; clones share the same tour.
#[derive(Clone)]
pub struct TourOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    places: Arc<dyn PlaceLookup>,
    narrator: Arc<dyn NarrationGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
    player: Arc<dyn AudioPlayer>,
    state: StateStore,
    position: PositionTracker,
    settings: watch::Sender<TourSettings>,
    /// In-flight guard: held from the identity check through `play`.
    pipeline: Mutex<()>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    next_playback_id: AtomicU64,
    lookups_in_flight: AtomicUsize,
}

/// Point of interest identity as it was before a pipeline claimed a new one.
struct PreviousPoi {
    key: Option<PoiKey>,
    poi: Option<PointOfInterest>,
    narration_text: String,
}

impl TourOrchestrator {
    pub fn new(
        places: Arc<dyn PlaceLookup>,
        narrator: Arc<dyn NarrationGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
        player: Arc<dyn AudioPlayer>,
        settings: TourSettings,
    ) -> Self {
        let (settings, _rx) = watch::channel(settings);
        Self {
            inner: Arc::new(Inner {
                places,
                narrator,
                speech,
                player,
                state: StateStore::new(),
                position: PositionTracker::new(),
                settings,
                pipeline: Mutex::new(()),
                poll_task: Mutex::new(None),
                next_playback_id: AtomicU64::new(0),
                lookups_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.inner.state.snapshot()
    }

    /// Change notifications for every state write.
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.inner.state.subscribe()
    }

    pub fn settings(&self) -> TourSettings {
        self.inner.settings.borrow().clone()
    }

    pub fn position(&self) -> Option<PositionFix> {
        self.inner.position.latest()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.snapshot().is_running
    }

    /// Feeds a device position. Only the latest one is read, once per poll.
    pub fn on_position_update(&self, coordinate: Coordinate, locality: Option<String>) -> bool {
        if !self.inner.position.update(coordinate, locality) {
            return false;
        }
        let locality = self.inner.position.latest().and_then(|fix| fix.locality);
        self.inner.state.update_if(|s| {
            if s.locality == locality {
                return false;
            }
            s.locality = locality;
            true
        });
        true
    }

    /// Starts (or reconfigures) the tour and polls once immediately.
    #[tracing::instrument(target = "orchestrator", skip_all, fields(coordinate = %initial))]
    pub async fn start_tour(
        &self,
        initial: Coordinate,
        radius: SearchRadius,
        poll_interval: PollInterval,
    ) -> Result<()> {
        if !self.on_position_update(initial, None) {
            return Err(WaysideError::ConfigError(format!(
                "Invalid start coordinate: {initial}"
            )));
        }
        self.inner.settings.send_modify(|s| {
            s.search_radius = radius;
            s.poll_interval = poll_interval;
        });
        self.inner.state.update(|s| s.is_running = true);

        let handle = spawn_poll_loop(&self.inner, poll_interval.as_duration(), true);
        if let Some(previous) = self.inner.poll_task.lock().await.replace(handle) {
            previous.abort();
        }
        info!(
            target: "orchestrator",
            radius_m = radius.meters(),
            interval = poll_interval.label(),
            "Tour started"
        );
        Ok(())
    }

    /// Stops audio, cancels the poll timer and resets the tour to Idle.
    /// In-flight provider calls keep running but their results are dropped.
    pub async fn stop_tour(&self) {
        if let Some(handle) = self.inner.poll_task.lock().await.take() {
            handle.abort();
        }
        self.inner.state.update(|s| s.reset());
        if let Err(e) = self.inner.player.stop().await {
            warn!(target: "orchestrator", error = %e, "Failed to stop audio");
        }
        info!(target: "orchestrator", "Tour stopped");
    }

    /// Manual stop; valid from any phase.
    pub async fn stop(&self) {
        self.stop_tour().await;
    }

    /// Runs one poll now, outside the timer. Returns when the pipeline it
    /// triggered (if any) has handed audio to the player.
    pub async fn poll_now(&self) {
        self.inner.poll().await;
    }

    pub async fn pause(&self) -> bool {
        self.inner
            .transition(PlaybackPhase::Speaking, PlaybackPhase::Paused)
            .await
    }

    pub async fn resume(&self) -> bool {
        self.inner
            .transition(PlaybackPhase::Paused, PlaybackPhase::Speaking)
            .await
    }

    /// Plays the current narration again from the start.
    ///
    /// Valid from Paused or FinishedVisible. The text is re-synthesized, which
    /// the speech cache serves without a network call unless another text
    /// was synthesized in between.
    pub async fn replay(&self) -> bool {
        let inner = &self.inner;
        let _guard = inner.pipeline.lock().await;

        let snapshot = inner.state.snapshot();
        if !matches!(
            snapshot.playback_phase,
            PlaybackPhase::Paused | PlaybackPhase::FinishedVisible
        ) || snapshot.narration_text.is_empty()
        {
            debug!(target: "orchestrator", phase = %snapshot.playback_phase, "Ignoring replay");
            return false;
        }

        let voice = inner.settings.borrow().voice.clone();
        match inner.speech.synthesize(&snapshot.narration_text, &voice).await {
            Ok(audio) => inner.start_playback(snapshot.session, audio).await,
            Err(e) => {
                warn!(target: "orchestrator", error = %e, "Replay synthesis failed");
                inner.state.update_in_session(snapshot.session, |s| {
                    s.playback_error = Some(e.to_string());
                });
                false
            }
        }
    }

    pub fn set_search_radius(&self, radius: SearchRadius) {
        self.inner.settings.send_modify(|s| s.search_radius = radius);
    }

    pub fn set_voice(&self, voice: impl Into<String>) {
        let voice = voice.into();
        self.inner.settings.send_modify(|s| s.voice = voice);
    }

    /// Takes effect from the next tick; a running timer is restarted.
    pub async fn set_poll_interval(&self, interval: PollInterval) {
        self.inner.settings.send_modify(|s| s.poll_interval = interval);
        let mut task = self.inner.poll_task.lock().await;
        if let Some(previous) = task.take() {
            previous.abort();
            *task = Some(spawn_poll_loop(&self.inner, interval.as_duration(), false));
            debug!(target: "orchestrator", interval = interval.label(), "Poll timer restarted");
        }
    }
}

fn spawn_poll_loop(inner: &Arc<Inner>, period: Duration, immediate: bool) -> JoinHandle<()> {
    let weak: Weak<Inner> = Arc::downgrade(inner);
    // Measured from the caller, not from when the task first runs.
    let start = if immediate {
        Instant::now()
    } else {
        Instant::now() + period
    };
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            // A slow pipeline must not delay the timer; the guard serializes.
            tokio::spawn(async move { inner.poll().await });
        }
    })
}

impl Inner {
    async fn poll(self: &Arc<Self>) {
        let snapshot = self.state.snapshot();
        if !snapshot.is_running {
            debug!(target: "orchestrator", "Tour not running; skipping poll");
            return;
        }
        let session = snapshot.session;
        let Some(fix) = self.position.latest() else {
            debug!(target: "orchestrator", "No position yet; skipping poll");
            return;
        };
        let (radius, voice) = {
            let settings = self.settings.borrow();
            (settings.search_radius.meters(), settings.voice.clone())
        };

        self.lookups_in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.update(|s| s.is_loading_places = true);
        let result = self.places.find_nearby(fix.coordinate, radius).await;
        let remaining = self.lookups_in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        self.state.update(|s| s.is_loading_places = remaining > 0);

        let pois = match result {
            Ok(pois) => pois,
            Err(e) => {
                if e.is_retryable() {
                    warn!(target: "orchestrator", error = %e, "Places lookup failed; retrying next poll");
                } else {
                    warn!(target: "orchestrator", error = %e, "Places lookup failed");
                }
                self.state.update_in_session(session, |s| {
                    s.places_error = Some(e.to_string());
                    s.last_poll_at = Some(Utc::now());
                });
                return;
            }
        };

        let candidate = pois.first().cloned();
        let current = self.state.update_in_session(session, |s| {
            s.places = pois;
            s.places_error = None;
            s.last_poll_at = Some(Utc::now());
        });
        if !current {
            debug!(target: "orchestrator", "Discarding stale places result");
            return;
        }
        match candidate {
            Some(poi) => self.run_pipeline(session, poi, voice).await,
            None => debug!(target: "orchestrator", coordinate = %fix.coordinate, "No points of interest nearby"),
        }
    }

    async fn run_pipeline(self: &Arc<Self>, session: u64, candidate: PointOfInterest, voice: String) {
        let _guard = self.pipeline.lock().await;
        let key = candidate.key();

        let mut previous = None;
        self.state.update_if(|s| {
            if s.session != session {
                return false;
            }
            if let Some(current) = &s.current_poi_key {
                if is_same_poi(current, &key) {
                    return false;
                }
            }
            previous = Some(PreviousPoi {
                key: s.current_poi_key.replace(key.clone()),
                poi: s.current_poi.replace(candidate.clone()),
                narration_text: s.narration_text.clone(),
            });
            s.is_loading_narration = true;
            s.narration_error = None;
            true
        });
        let Some(previous) = previous else {
            debug!(target: "orchestrator", poi = %key, "Same point of interest; nothing to do");
            return;
        };
        info!(target: "orchestrator", poi = %key, "New point of interest");

        let text = match self.narrator.generate_narration(&candidate).await {
            Ok(result) => result.text,
            Err(e) => {
                warn!(target: "orchestrator", poi = %key, error = %e, "Narration failed");
                self.state.update_in_session(session, |s| {
                    s.is_loading_narration = false;
                    s.narration_error = Some(e.to_string());
                    s.current_poi_key = previous.key;
                    s.current_poi = previous.poi;
                });
                return;
            }
        };

        let current = self.state.update_in_session(session, |s| {
            s.is_loading_narration = false;
            s.narration_text = text.clone();
        });
        if !current {
            debug!(target: "orchestrator", poi = %key, "Discarding stale narration");
            return;
        }

        let audio = match self.speech.synthesize(&text, &voice).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(target: "orchestrator", poi = %key, error = %e, "Speech synthesis failed");
                self.state.update_in_session(session, |s| {
                    s.playback_error = Some(e.to_string());
                    s.current_poi_key = previous.key;
                    s.current_poi = previous.poi;
                    s.narration_text = previous.narration_text;
                });
                return;
            }
        };

        if self.start_playback(session, audio).await {
            info!(target: "orchestrator", poi = %key, "Narration playing");
        }
    }

    /// Marks the phase Speaking and hands `audio` to the player.
    async fn start_playback(self: &Arc<Self>, session: u64, audio: AudioBlob) -> bool {
        let id = self.next_playback_id.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.state.update_in_session(session, |s| {
            s.playback_id = id;
            s.playback_phase = PlaybackPhase::Speaking;
            s.playback_error = None;
        });
        if !current {
            debug!(target: "orchestrator", "Discarding stale audio");
            return false;
        }

        if let Err(e) = self.player.play(audio, self.ticket(id)).await {
            warn!(target: "orchestrator", error = %e, "Playback failed to start");
            self.state.update_if(|s| {
                if s.playback_id != id {
                    return false;
                }
                s.playback_phase = PlaybackPhase::Idle;
                s.playback_error = Some(e.to_string());
                true
            });
            return false;
        }

        // stop_tour may have run while the player was starting.
        if self.state.snapshot().session != session {
            if let Err(e) = self.player.stop().await {
                warn!(target: "orchestrator", error = %e, "Failed to stop stale audio");
            }
            return false;
        }
        true
    }

    fn ticket(self: &Arc<Self>, id: u64) -> PlaybackTicket {
        let weak = Arc::downgrade(self);
        PlaybackTicket::new(id, move |id, outcome| {
            if let Some(inner) = weak.upgrade() {
                inner.on_playback_outcome(id, outcome);
            }
        })
    }

    fn on_playback_outcome(&self, id: u64, outcome: PlaybackOutcome) {
        let applied = self.state.update_if(|s| {
            if s.playback_id != id {
                return false;
            }
            match &outcome {
                PlaybackOutcome::Finished if s.playback_phase == PlaybackPhase::Speaking => {
                    s.playback_phase = PlaybackPhase::FinishedVisible;
                    true
                }
                PlaybackOutcome::Failed(reason)
                    if matches!(
                        s.playback_phase,
                        PlaybackPhase::Speaking | PlaybackPhase::Paused
                    ) =>
                {
                    s.playback_phase = PlaybackPhase::Idle;
                    s.playback_error = Some(reason.clone());
                    true
                }
                _ => false,
            }
        });
        if applied {
            debug!(target: "orchestrator", playback = id, outcome = ?outcome, "Playback ended");
        }
    }

    /// Moves `from → to` around a player pause/resume; no-op from any other phase.
    async fn transition(&self, from: PlaybackPhase, to: PlaybackPhase) -> bool {
        let snapshot = self.state.snapshot();
        if snapshot.playback_phase != from {
            debug!(
                target: "orchestrator",
                phase = %snapshot.playback_phase,
                requested = %to,
                "Ignoring illegal playback control"
            );
            return false;
        }

        let result = if to == PlaybackPhase::Paused {
            self.player.pause().await
        } else {
            self.player.resume().await
        };
        if let Err(e) = result {
            warn!(target: "orchestrator", error = %e, requested = %to, "Player control failed");
            self.state.update_in_session(snapshot.session, |s| {
                s.playback_error = Some(e.to_string());
            });
            return false;
        }

        // A new narration may have started while the player was signalled.
        self.state.update_if(|s| {
            if s.session != snapshot.session
                || s.playback_id != snapshot.playback_id
                || s.playback_phase != from
            {
                return false;
            }
            s.playback_phase = to;
            true
        })
    }
}
