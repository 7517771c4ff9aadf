//! Tour settings exposed to the presentation layer.
//!
//! Provider credentials and endpoints live next to each client
//! (`PlacesConfig`, `NarrationConfig`, `SpeechConfig`); this module holds the
//! user-adjustable knobs: search radius, poll interval presets and voice.

use crate::{Result, WaysideError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Voice used when neither config nor `LMNT_VOICE` name one.
pub const DEFAULT_VOICE: &str = "ava";

/// Non-empty environment variable lookup.
pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

pub(crate) fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.trim().parse::<T>().ok())
}

/// Places search radius in meters, always within the user-adjustable range.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct SearchRadius(f64);

impl SearchRadius {
    pub const MIN_METERS: f64 = 100.0;
    pub const MAX_METERS: f64 = 1000.0;
    pub const STEP_METERS: f64 = 100.0;
    pub const DEFAULT_METERS: f64 = 200.0;

    /// Clamps into `[MIN_METERS, MAX_METERS]`; non-finite input yields the default.
    pub fn new(meters: f64) -> Self {
        if !meters.is_finite() {
            return Self::default();
        }
        Self(meters.clamp(Self::MIN_METERS, Self::MAX_METERS))
    }

    pub fn meters(&self) -> f64 {
        self.0
    }

    /// Rounds to the nearest 100 m step (slider semantics).
    pub fn snapped(self) -> Self {
        Self::new((self.0 / Self::STEP_METERS).round() * Self::STEP_METERS)
    }

    pub fn step_up(self) -> Self {
        Self::new(self.snapped().0 + Self::STEP_METERS)
    }

    pub fn step_down(self) -> Self {
        Self::new(self.snapped().0 - Self::STEP_METERS)
    }
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self(Self::DEFAULT_METERS)
    }
}

impl From<f64> for SearchRadius {
    fn from(meters: f64) -> Self {
        Self::new(meters)
    }
}

impl From<SearchRadius> for f64 {
    fn from(radius: SearchRadius) -> Self {
        radius.0
    }
}

/// Poll cadence presets offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum PollInterval {
    ThirtySeconds,
    #[default]
    OneMinute,
    TwoMinutes,
    FiveMinutes,
}

impl PollInterval {
    pub const ALL: [PollInterval; 4] = [
        PollInterval::ThirtySeconds,
        PollInterval::OneMinute,
        PollInterval::TwoMinutes,
        PollInterval::FiveMinutes,
    ];

    pub fn as_secs(self) -> u64 {
        match self {
            PollInterval::ThirtySeconds => 30,
            PollInterval::OneMinute => 60,
            PollInterval::TwoMinutes => 120,
            PollInterval::FiveMinutes => 300,
        }
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.as_secs())
    }

    pub fn from_secs(secs: u64) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_secs() == secs)
            .ok_or_else(|| {
                WaysideError::ConfigError(format!(
                    "Unsupported poll interval {secs}s (expected one of 30, 60, 120, 300)"
                ))
            })
    }

    pub fn label(self) -> &'static str {
        match self {
            PollInterval::ThirtySeconds => "30s",
            PollInterval::OneMinute => "1 min",
            PollInterval::TwoMinutes => "2 min",
            PollInterval::FiveMinutes => "5 min",
        }
    }
}

impl TryFrom<u64> for PollInterval {
    type Error = WaysideError;

    fn try_from(secs: u64) -> Result<Self> {
        Self::from_secs(secs)
    }
}

impl From<PollInterval> for u64 {
    fn from(interval: PollInterval) -> Self {
        interval.as_secs()
    }
}

/// User-adjustable tour settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourSettings {
    #[serde(default)]
    pub search_radius: SearchRadius,
    #[serde(default)]
    pub poll_interval: PollInterval,
    #[serde(default = "default_voice")]
    pub voice: String,
}

fn default_voice() -> String {
    env_string("LMNT_VOICE").unwrap_or_else(|| DEFAULT_VOICE.to_string())
}

impl Default for TourSettings {
    fn default() -> Self {
        Self {
            search_radius: SearchRadius::default(),
            poll_interval: PollInterval::default(),
            voice: default_voice(),
        }
    }
}
