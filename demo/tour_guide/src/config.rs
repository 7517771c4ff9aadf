use std::fs;
use std::path::{Path, PathBuf};

use wayside_core::audio::ProcessPlayerConfig;
use wayside_core::{
    Coordinate, NarrationConfig, Placemark, PlacesConfig, PollInterval, SearchRadius,
    SpeechConfig, TourSettings,
};

/// High-level configuration for the Tour Guide demo
#[derive(Clone, Debug)]
pub struct TourGuideConfig {
    pub places: PlacesConfig,
    pub narration: NarrationConfig,
    pub speech: SpeechConfig,
    pub audio: ProcessPlayerConfig,
    pub tour: TourSettings,
    pub route: RouteConfig,
}

/// Simulated drive fed to the orchestrator as position updates
#[derive(Clone, Debug)]
pub struct RouteConfig {
    pub waypoints: Vec<Waypoint>,
    /// Seconds between consecutive waypoints
    pub step_secs: u64,
    /// Start over from the first waypoint after the last one
    pub repeat: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub administrative_area: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Waypoint {
    fn new(latitude: f64, longitude: f64, locality: &str) -> Self {
        Self {
            latitude,
            longitude,
            locality: Some(locality.to_string()),
            administrative_area: Some("CA".to_string()),
            country: None,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Locality label as the platform geocoder would report it.
    pub fn locality_label(&self) -> Option<String> {
        if self.locality.is_none() && self.administrative_area.is_none() && self.country.is_none()
        {
            return None;
        }
        let placemark = Placemark {
            locality: self.locality.clone(),
            administrative_area: self.administrative_area.clone(),
            country: self.country.clone(),
        };
        Some(placemark.describe())
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        // A short drive along the San Francisco waterfront
        Self {
            waypoints: vec![
                Waypoint::new(37.8078, -122.4750, "Presidio"),
                Waypoint::new(37.8024, -122.4484, "Marina District"),
                Waypoint::new(37.8080, -122.4177, "Fisherman's Wharf"),
                Waypoint::new(37.8024, -122.4058, "Telegraph Hill"),
                Waypoint::new(37.7955, -122.3937, "Embarcadero"),
            ],
            step_secs: std::env::var("ROUTE_STEP_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(45),
            repeat: false,
        }
    }
}

impl Default for TourGuideConfig {
    fn default() -> Self {
        // Provider defaults already consider env vars
        Self {
            places: PlacesConfig::default(),
            narration: NarrationConfig::default(),
            speech: SpeechConfig::default(),
            audio: ProcessPlayerConfig::default(),
            tour: TourSettings::default(),
            route: RouteConfig::default(),
        }
    }
}

impl TourGuideConfig {
    /// Load configuration from a TOML file (path via TOUR_GUIDE_CONFIG or ./tour_guide.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("TOUR_GUIDE_CONFIG").unwrap_or_else(|_| "tour_guide.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "tour_guide", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match Self::from_toml_str(&s, default.clone()) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(target: "tour_guide", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "tour_guide", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    pub fn from_toml_str(s: &str, base: Self) -> Result<Self, toml::de::Error> {
        let overlay: TourGuideToml = toml::from_str(s)?;
        Ok(overlay.overlay(base))
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct TourGuideToml {
    pub places: Option<PlacesToml>,
    pub narration: Option<NarrationToml>,
    pub speech: Option<SpeechToml>,
    pub audio: Option<AudioToml>,
    pub tour: Option<TourToml>,
    pub route: Option<RouteToml>,
}

impl TourGuideToml {
    fn overlay(self, mut base: TourGuideConfig) -> TourGuideConfig {
        if let Some(p) = self.places {
            p.apply(&mut base.places);
        }
        if let Some(n) = self.narration {
            n.apply(&mut base.narration);
        }
        if let Some(s) = self.speech {
            s.apply(&mut base.speech);
        }
        if let Some(a) = self.audio {
            a.apply(&mut base.audio);
        }
        if let Some(t) = self.tour {
            t.apply(&mut base.tour);
        }
        if let Some(r) = self.route {
            r.apply(&mut base.route);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct PlacesToml {
    pub base_url: Option<String>,
    pub included_types: Option<Vec<String>>,
    pub timeout_ms: Option<u64>,
}
impl PlacesToml {
    fn apply(self, p: &mut PlacesConfig) {
        if let Some(x) = self.base_url {
            p.base_url = x;
        }
        if let Some(x) = self.included_types {
            let types: Vec<String> = x.into_iter().filter(|t| !t.is_empty()).collect();
            if !types.is_empty() {
                p.included_types = types;
            }
        }
        if let Some(x) = self.timeout_ms {
            p.timeout_ms = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct NarrationToml {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub request_timeout_ms: Option<u64>,
}
impl NarrationToml {
    fn apply(self, n: &mut NarrationConfig) {
        if let Some(x) = self.base_url {
            n.base_url = x;
        }
        if let Some(x) = self.model {
            n.model = x;
        }
        if let Some(x) = self.request_timeout_ms {
            n.request_timeout_ms = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SpeechToml {
    pub base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
}
impl SpeechToml {
    fn apply(self, s: &mut SpeechConfig) {
        if let Some(x) = self.base_url {
            s.base_url = x;
        }
        if let Some(x) = self.request_timeout_ms {
            s.request_timeout_ms = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AudioToml {
    pub player: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub keep_files: Option<bool>,
}
impl AudioToml {
    fn apply(self, a: &mut ProcessPlayerConfig) {
        if let Some(x) = self.player {
            a.player_bin = Some(x);
        }
        if let Some(x) = self.temp_dir {
            a.temp_dir = x;
        }
        if let Some(x) = self.keep_files {
            a.keep_files = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct TourToml {
    pub search_radius_m: Option<f64>,
    pub poll_interval_secs: Option<u64>,
    pub voice: Option<String>,
}
impl TourToml {
    fn apply(self, t: &mut TourSettings) {
        if let Some(x) = self.search_radius_m {
            t.search_radius = SearchRadius::new(x).snapped();
        }
        if let Some(x) = self.poll_interval_secs {
            match PollInterval::from_secs(x) {
                Ok(interval) => t.poll_interval = interval,
                Err(e) => {
                    tracing::warn!(target: "tour_guide", error = %e, "Keeping default poll interval")
                }
            }
        }
        if let Some(x) = self.voice.filter(|v| !v.trim().is_empty()) {
            t.voice = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct RouteToml {
    pub waypoints: Option<Vec<Waypoint>>,
    pub step_secs: Option<u64>,
    pub repeat: Option<bool>,
}
impl RouteToml {
    fn apply(self, r: &mut RouteConfig) {
        if let Some(x) = self.waypoints {
            let valid: Vec<Waypoint> = x
                .into_iter()
                .filter(|w| w.coordinate().is_valid())
                .collect();
            if !valid.is_empty() {
                r.waypoints = valid;
            }
        }
        if let Some(x) = self.step_secs {
            r.step_secs = x.max(1);
        }
        if let Some(x) = self.repeat {
            r.repeat = x;
        }
    }
}
