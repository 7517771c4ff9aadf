//! Places Lookup Provider
//!
//! Finds nearby points of interest through the Google Places "searchNearby"
//! endpoint. Results are ranked by the provider and capped at
//! `MAX_RESULTS`; only the top entry drives narration, the rest are kept
//! for display.

use crate::config::{env_parse, env_string};
use crate::geo::Coordinate;
use crate::http::{build_client, ensure_success, require_base_url, require_key, transport_error};
use crate::{Result, WaysideError};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::{debug, warn};

/// Provider cap on results per search.
pub const MAX_RESULTS: usize = 10;

/// Largest photo width the media endpoint accepts.
pub const MAX_PHOTO_WIDTH_PX: u32 = 4800;

const FIELD_MASK: &str = "places.displayName,places.formattedAddress,places.primaryType,places.types,places.location,places.photos";

/// Configuration for the places provider
#[derive(Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    /// API base URL (default: Google Places API v1)
    pub base_url: String,
    pub api_key: Option<String>,
    /// Place types included in the search
    pub included_types: Vec<String>,
    /// Timeout for API requests in milliseconds
    pub timeout_ms: u64,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: env_string("PLACES_BASE_URL")
                .unwrap_or_else(|| "https://places.googleapis.com".to_string()),
            api_key: env_string("GOOGLE_PLACES_API_KEY"),
            included_types: vec!["tourist_attraction".to_string()],
            timeout_ms: env_parse("PLACES_TIMEOUT_MS").unwrap_or(30_000),
        }
    }
}

impl fmt::Debug for PlacesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacesConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("included_types", &self.included_types)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Provider-assigned photo reference; resolved to a URL on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    /// Resource name, e.g. `places/ChIJ.../photos/AUc...`
    pub name: String,
    pub width_px: u32,
    pub height_px: u32,
}

/// Identity of a point of interest for change detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoiKey {
    pub name: String,
    pub address: String,
}

impl fmt::Display for PoiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Two keys denote the same point of interest when name and address match exactly.
pub fn is_same_poi(a: &PoiKey, b: &PoiKey) -> bool {
    a.name == b.name && a.address == b.address
}

/// A discoverable place returned by the lookup provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub name: String,
    pub address: String,
    pub primary_category: Option<String>,
    pub categories: Vec<String>,
    pub coordinate: Coordinate,
    pub photo_refs: Vec<PhotoRef>,
}

impl PointOfInterest {
    pub fn key(&self) -> PoiKey {
        PoiKey {
            name: self.name.clone(),
            address: self.address.clone(),
        }
    }
}

/// Places searchNearby response
#[derive(Debug, Deserialize)]
struct SearchNearbyResponse {
    #[serde(default)]
    places: Vec<ApiPlace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlace {
    display_name: Option<ApiText>,
    #[serde(default)]
    formatted_address: String,
    primary_type: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    location: Option<ApiLocation>,
    #[serde(default)]
    photos: Vec<ApiPhoto>,
}

#[derive(Debug, Deserialize)]
struct ApiText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiLocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPhoto {
    name: String,
    #[serde(default)]
    width_px: u32,
    #[serde(default)]
    height_px: u32,
}

impl ApiPlace {
    fn into_poi(self) -> Option<PointOfInterest> {
        let name = self.display_name.map(|d| d.text)?;
        let location = self.location?;
        Some(PointOfInterest {
            name,
            address: self.formatted_address,
            primary_category: self.primary_type.filter(|t| !t.is_empty()),
            categories: self.types,
            coordinate: Coordinate::new(location.latitude, location.longitude),
            photo_refs: self
                .photos
                .into_iter()
                .map(|p| PhotoRef {
                    name: p.name,
                    width_px: p.width_px,
                    height_px: p.height_px,
                })
                .collect(),
        })
    }
}

/// Seam the orchestrator uses to find nearby points of interest.
#[async_trait]
pub trait PlaceLookup: Send + Sync {
    /// Ranked nearby points of interest, most relevant first, at most `MAX_RESULTS`.
    async fn find_nearby(
        &self,
        coordinate: Coordinate,
        radius_meters: f64,
    ) -> Result<Vec<PointOfInterest>>;
}

/// Google Places client
pub struct PlacesClient {
    config: PlacesConfig,
    http_client: reqwest::Client,
}

impl PlacesClient {
    pub fn new() -> Result<Self> {
        Self::with_config(PlacesConfig::default())
    }

    pub fn with_config(config: PlacesConfig) -> Result<Self> {
        let http_client = build_client(config.timeout_ms)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &PlacesConfig {
        &self.config
    }

    /// Media URL for a photo at the requested maximum width.
    pub fn photo_url(&self, photo: &PhotoRef, max_width_px: u32) -> Result<String> {
        let key = require_key("Places", "GOOGLE_PLACES_API_KEY", &self.config.api_key)?;
        let base = require_base_url("Places", &self.config.base_url)?;
        if photo.name.trim().is_empty() {
            return Err(WaysideError::ConfigError(
                "Photo reference has no resource name".to_string(),
            ));
        }
        let width = max_width_px.clamp(1, MAX_PHOTO_WIDTH_PX);
        let mut url = Url::parse(&format!("{}/v1/{}/media", base, photo.name))
            .map_err(|e| WaysideError::ConfigError(format!("Invalid photo URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("maxWidthPx", &width.to_string())
            .append_pair("key", key);
        Ok(url.into())
    }
}

#[async_trait]
impl PlaceLookup for PlacesClient {
    async fn find_nearby(
        &self,
        coordinate: Coordinate,
        radius_meters: f64,
    ) -> Result<Vec<PointOfInterest>> {
        let key = require_key("Places", "GOOGLE_PLACES_API_KEY", &self.config.api_key)?;
        let base = require_base_url("Places", &self.config.base_url)?;
        let url = format!("{}/v1/places:searchNearby", base);

        debug!(target: "places", %coordinate, radius = radius_meters, "Searching nearby places");

        let body = json!({
            "includedTypes": self.config.included_types,
            "maxResultCount": MAX_RESULTS,
            "locationRestriction": {
                "circle": {
                    "center": {
                        "latitude": coordinate.latitude,
                        "longitude": coordinate.longitude,
                    },
                    "radius": radius_meters,
                }
            }
        });

        let response = self
            .http_client
            .post(&url)
            .header("X-Goog-Api-Key", key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "places", error = %e, "Places API request failed");
                transport_error("Places", e)
            })?;

        let response = ensure_success("Places", response).await.map_err(|e| {
            warn!(target: "places", error = %e, "Places API returned error");
            e
        })?;

        let parsed: SearchNearbyResponse = response.json().await.map_err(|e| {
            warn!(target: "places", error = %e, "Failed to parse places response");
            WaysideError::DecodeError(format!("Failed to parse places response: {}", e))
        })?;

        let places: Vec<PointOfInterest> = parsed
            .places
            .into_iter()
            .filter_map(ApiPlace::into_poi)
            .take(MAX_RESULTS)
            .collect();

        debug!(target: "places", count = places.len(), top = ?places.first().map(|p| &p.name), "Places search complete");
        Ok(places)
    }
}
