//! Coordinates and the latest-position store fed by the device position source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;
use tracing::{debug, warn};

/// WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Reverse-geocoded place naming, as delivered by the platform geocoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placemark {
    pub locality: Option<String>,
    pub administrative_area: Option<String>,
    pub country: Option<String>,
}

impl Placemark {
    /// "Locality, Area, Country" from whichever parts are present.
    pub fn describe(&self) -> String {
        let parts: Vec<&str> = [&self.locality, &self.administrative_area, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            "Unknown location".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// One accepted position update.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    pub coordinate: Coordinate,
    pub locality: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// Holds the most recent position; readers sample it at their own cadence.
///
/// Updates arrive at device rate, the orchestrator only looks at the latest
/// value on each poll tick, which is what debounces the stream.
#[derive(Debug)]
pub struct PositionTracker {
    tx: watch::Sender<Option<PositionFix>>,
}

impl PositionTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Records a position. Invalid coordinates are dropped; a missing locality
    /// keeps the previously known label.
    pub fn update(&self, coordinate: Coordinate, locality: Option<String>) -> bool {
        if !coordinate.is_valid() {
            warn!(target: "orchestrator", %coordinate, "Ignoring invalid coordinate");
            return false;
        }
        self.tx.send_modify(|slot| {
            let locality = locality
                .filter(|l| !l.trim().is_empty())
                .or_else(|| slot.as_ref().and_then(|fix| fix.locality.clone()));
            debug!(target: "orchestrator", %coordinate, locality = ?locality, "Position update");
            *slot = Some(PositionFix {
                coordinate,
                locality,
                received_at: Utc::now(),
            });
        });
        true
    }

    pub fn latest(&self) -> Option<PositionFix> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PositionFix>> {
        self.tx.subscribe()
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}
