mod config;
use config::{RouteConfig, TourGuideConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use wayside_core::{
    NarrationClient, OrchestratorState, PlacesClient, ProcessPlayer, SpeechClient,
    TourOrchestrator,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,wayside_core=info,tour_guide=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        target: "tour_guide",
        "Starting Tour Guide demo: route → places → narration → speech → playback"
    );

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = TourGuideConfig::load();
    info!(target: "tour_guide", places = ?cfg.places, narration = ?cfg.narration, speech = ?cfg.speech, "Provider configuration");

    let Some(first) = cfg.route.waypoints.first().cloned() else {
        error!(target: "tour_guide", "Route has no waypoints");
        return Ok(());
    };

    // Provider clients and the local audio player
    let places = PlacesClient::with_config(cfg.places.clone())?;
    let narrator = NarrationClient::new(cfg.narration.clone())?;
    let speech = SpeechClient::new(cfg.speech.clone())?;
    let player = ProcessPlayer::new(Some(cfg.audio.clone()));

    let orchestrator = TourOrchestrator::new(
        Arc::new(places),
        Arc::new(narrator),
        Arc::new(speech),
        Arc::new(player),
        cfg.tour.clone(),
    );

    // Log every state change a UI would render
    let state_task = {
        let mut rx = orchestrator.subscribe();
        tokio::spawn(async move {
            let mut last = rx.borrow().clone();
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                log_state_change(&last, &state);
                last = state;
            }
        })
    };

    orchestrator.on_position_update(first.coordinate(), first.locality_label());
    orchestrator
        .start_tour(
            first.coordinate(),
            cfg.tour.search_radius,
            cfg.tour.poll_interval,
        )
        .await?;

    // Feed the simulated route as device position updates
    let route_task = tokio::spawn(drive_route(orchestrator.clone(), cfg.route.clone()));

    // Ctrl+C handler to shutdown gracefully
    match signal::ctrl_c().await {
        Ok(()) => info!(target: "tour_guide", "Shutting down..."),
        Err(e) => error!(target: "tour_guide", error = %e, "Failed to listen for Ctrl+C"),
    }

    route_task.abort();
    orchestrator.stop_tour().await;
    state_task.abort();
    Ok(())
}

async fn drive_route(orchestrator: TourOrchestrator, route: RouteConfig) {
    let mut ticker = tokio::time::interval(Duration::from_secs(route.step_secs.max(1)));
    // The first waypoint was already fed at start.
    ticker.tick().await;
    loop {
        for (i, waypoint) in route.waypoints.iter().enumerate().skip(1) {
            ticker.tick().await;
            let accepted =
                orchestrator.on_position_update(waypoint.coordinate(), waypoint.locality_label());
            if accepted {
                info!(
                    target: "tour_guide",
                    waypoint = i,
                    coordinate = %waypoint.coordinate(),
                    locality = ?waypoint.locality_label(),
                    "Moved"
                );
            } else {
                warn!(target: "tour_guide", waypoint = i, "Skipping invalid waypoint");
            }
        }
        if !route.repeat {
            info!(target: "tour_guide", "Route finished; holding last position");
            return;
        }
        if let Some(first) = route.waypoints.first() {
            ticker.tick().await;
            orchestrator.on_position_update(first.coordinate(), first.locality_label());
        }
    }
}

fn log_state_change(prev: &OrchestratorState, next: &OrchestratorState) {
    if prev.locality != next.locality {
        info!(target: "tour_guide", locality = ?next.locality, "📍 Location");
    }
    if prev.current_poi_key != next.current_poi_key {
        if let Some(key) = &next.current_poi_key {
            info!(target: "tour_guide", poi = %key, "🏛️  Nearby attraction");
        }
    }
    if prev.is_loading() != next.is_loading() && next.is_loading() {
        info!(
            target: "tour_guide",
            places = next.is_loading_places,
            narration = next.is_loading_narration,
            "⏳ Loading"
        );
    }
    if prev.narration_text != next.narration_text && !next.narration_text.is_empty() {
        info!(target: "tour_guide", "📝 {}", next.narration_text);
    }
    if prev.playback_phase != next.playback_phase {
        info!(target: "tour_guide", phase = %next.playback_phase, "🔊 Playback");
    }
    if prev.error_message() != next.error_message() {
        if let Some(err) = next.error_message() {
            warn!(target: "tour_guide", error = %err, "Tour error");
        }
    }
}
