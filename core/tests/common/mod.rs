//! Hand-written fakes for orchestrator tests.
//!
//! Each fake counts its calls and can be told to fail; the gated ones can
//! hold their next call open so tests can interleave stop/poll with an
//! in-flight request.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use wayside_core::audio::{AudioBlob, AudioPlayer, PlaybackTicket};
use wayside_core::llm::{NarrationGenerator, NarrationResult};
use wayside_core::providers::{PlaceLookup, PointOfInterest};
use wayside_core::tts::SpeechSynthesizer;
use wayside_core::{
    Coordinate, OrchestratorState, Result, TourOrchestrator, TourSettings, WaysideError,
};

pub const SF: Coordinate = Coordinate::new(37.8199, -122.4783);

pub fn poi(name: &str, address: &str) -> PointOfInterest {
    PointOfInterest {
        name: name.to_string(),
        address: address.to_string(),
        primary_category: Some("tourist_attraction".to_string()),
        categories: vec!["tourist_attraction".to_string()],
        coordinate: SF,
        photo_refs: vec![],
    }
}

pub fn narration_for(name: &str) -> String {
    format!("You are passing {name}.")
}

/// Holds the next call open until released; later calls pass straight through.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
pub struct FakePlaces {
    results: Mutex<Option<Vec<PointOfInterest>>>,
    calls: AtomicUsize,
    last_coordinate: Mutex<Option<Coordinate>>,
}

impl FakePlaces {
    pub fn returning(pois: Vec<PointOfInterest>) -> Arc<Self> {
        let fake = Self::default();
        fake.set(pois);
        Arc::new(fake)
    }

    pub fn set(&self, pois: Vec<PointOfInterest>) {
        *self.results.lock().unwrap() = Some(pois);
    }

    /// Subsequent lookups fail with a network error.
    pub fn fail(&self) {
        *self.results.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_coordinate(&self) -> Option<Coordinate> {
        *self.last_coordinate.lock().unwrap()
    }
}

#[async_trait]
impl PlaceLookup for FakePlaces {
    async fn find_nearby(
        &self,
        coordinate: Coordinate,
        _radius_meters: f64,
    ) -> Result<Vec<PointOfInterest>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_coordinate.lock().unwrap() = Some(coordinate);
        self.results
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| WaysideError::NetworkError("places offline".to_string()))
    }
}

#[derive(Default)]
pub struct FakeNarrator {
    calls: AtomicUsize,
    fail: AtomicBool,
    pub gate: Gate,
}

impl FakeNarrator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NarrationGenerator for FakeNarrator {
    async fn generate_narration(&self, poi: &PointOfInterest) -> Result<NarrationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(WaysideError::NetworkError("generator timed out".to_string()));
        }
        Ok(NarrationResult {
            text: narration_for(&poi.name),
        })
    }
}

#[derive(Default)]
pub struct FakeSpeech {
    texts: Mutex<Vec<String>>,
    fail: AtomicBool,
    pub gate: Gate,
}

impl FakeSpeech {
    pub fn calls(&self) -> usize {
        self.texts.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<AudioBlob> {
        self.texts.lock().unwrap().push(text.to_string());
        self.gate.pass().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(WaysideError::DecodeError("no audio data".to_string()));
        }
        Ok(AudioBlob::new(text.as_bytes().to_vec(), text, "mp3"))
    }
}

/// Records every playback ticket so tests can finish or fail them by hand.
#[derive(Default)]
pub struct FakePlayer {
    tickets: Mutex<Vec<PlaybackTicket>>,
    played: Mutex<Vec<String>>,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
    stops: AtomicUsize,
    fail_play: AtomicBool,
    pub pause_gate: Gate,
}

impl FakePlayer {
    pub fn plays(&self) -> usize {
        self.played.lock().unwrap().len()
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn set_fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    /// Completes the most recent playback naturally.
    pub fn finish_last(&self) {
        if let Some(ticket) = self.tickets.lock().unwrap().pop() {
            ticket.finished();
        }
    }

    pub fn fail_last(&self, reason: &str) {
        if let Some(ticket) = self.tickets.lock().unwrap().pop() {
            ticket.failed(reason);
        }
    }

    /// Completes the oldest outstanding playback naturally.
    pub fn finish_first(&self) {
        let mut tickets = self.tickets.lock().unwrap();
        if !tickets.is_empty() {
            tickets.remove(0).finished();
        }
    }
}

#[async_trait]
impl AudioPlayer for FakePlayer {
    async fn play(&self, audio: AudioBlob, ticket: PlaybackTicket) -> Result<()> {
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(WaysideError::PlaybackError("unsupported format".to_string()));
        }
        self.played
            .lock()
            .unwrap()
            .push(audio.source_text().to_string());
        self.tickets.lock().unwrap().push(ticket);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        self.pause_gate.pass().await;
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub orchestrator: TourOrchestrator,
    pub places: Arc<FakePlaces>,
    pub narrator: Arc<FakeNarrator>,
    pub speech: Arc<FakeSpeech>,
    pub player: Arc<FakePlayer>,
}

impl Harness {
    pub fn new(pois: Vec<PointOfInterest>) -> Self {
        let places = FakePlaces::returning(pois);
        let narrator = Arc::new(FakeNarrator::default());
        let speech = Arc::new(FakeSpeech::default());
        let player = Arc::new(FakePlayer::default());
        let orchestrator = TourOrchestrator::new(
            places.clone(),
            narrator.clone(),
            speech.clone(),
            player.clone(),
            TourSettings {
                voice: "ava".to_string(),
                ..TourSettings::default()
            },
        );
        Self {
            orchestrator,
            places,
            narrator,
            speech,
            player,
        }
    }
}

/// Waits (bounded) until the published state satisfies `pred`.
pub async fn wait_for_state(
    orchestrator: &TourOrchestrator,
    pred: impl FnMut(&OrchestratorState) -> bool,
) -> OrchestratorState {
    let mut rx: watch::Receiver<OrchestratorState> = orchestrator.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for orchestrator state")
        .expect("state store closed");
    state.clone()
}

/// Lets spawned tasks on a current-thread runtime run to their next await.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
