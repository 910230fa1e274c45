//! Geo events and the admission rules applied before inference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::period::TimeRange;
use crate::types::ClientId;

/// Action tags that qualify a login-like event for place inference.
pub const DEFAULT_ACTIONS: [&str; 2] = ["Login Success", "Authorization Success"];

/// Broader action set used when building meeting-planner context.
pub const PLANNER_ACTIONS: [&str; 4] = [
    "app_open",
    "view",
    "Login Success",
    "Authorization Success",
];

/// Action set used for heatmap points when the caller names none.
pub const HEATMAP_ACTIONS: [&str; 1] = ["Login Success"];

const MAX_ABS_LATITUDE: f64 = 85.0;
const MAX_ABS_LONGITUDE: f64 = 180.0;

/// A geo event as stored, before any validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGeoEvent {
    pub client_id: ClientId,
    pub action: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// A validated geo event: coordinates are present, non-zero and in range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoEvent {
    pub client_id: ClientId,
    pub action: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl GeoEvent {
    /// Promotes a raw row, or returns `None` when its coordinates are unusable.
    pub fn try_from_raw(raw: RawGeoEvent) -> Option<Self> {
        let (latitude, longitude) = admissible_coordinates(raw.latitude, raw.longitude)?;
        Some(Self {
            client_id: raw.client_id,
            action: raw.action,
            latitude,
            longitude,
            timestamp: raw.timestamp,
        })
    }
}

/// Returns the pair when both values are present, finite, non-zero and
/// within `[-85, 85]` x `[-180, 180]`.
pub fn admissible_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Option<(f64, f64)> {
    let (lat, lon) = (latitude?, longitude?);
    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    if lat == 0.0 || lon == 0.0 {
        return None;
    }
    if lat.abs() > MAX_ABS_LATITUDE || lon.abs() > MAX_ABS_LONGITUDE {
        return None;
    }
    Some((lat, lon))
}

/// Which events a query admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    /// Qualifying action tags. Never empty.
    pub actions: Vec<String>,
    /// Inclusive time window.
    pub range: TimeRange,
}

impl EventFilter {
    /// Builds a filter, substituting `defaults` when `actions` is empty.
    pub fn new(actions: Vec<String>, defaults: &[&str], range: TimeRange) -> Self {
        let actions = if actions.is_empty() {
            defaults.iter().map(|a| (*a).to_string()).collect()
        } else {
            actions
        };
        Self { actions, range }
    }

    /// A filter with the default login actions.
    pub fn with_default_actions(range: TimeRange) -> Self {
        Self::new(Vec::new(), &DEFAULT_ACTIONS, range)
    }

    /// Admits a single raw row.
    pub fn admits(&self, raw: RawGeoEvent) -> Option<GeoEvent> {
        if !self.actions.iter().any(|a| *a == raw.action) {
            return None;
        }
        if !self.range.contains(raw.timestamp) {
            return None;
        }
        GeoEvent::try_from_raw(raw)
    }

    /// Admits rows and orders them most-recent-first.
    pub fn load<I>(&self, rows: I) -> Vec<GeoEvent>
    where
        I: IntoIterator<Item = RawGeoEvent>,
    {
        let mut events: Vec<GeoEvent> = rows.into_iter().filter_map(|r| self.admits(r)).collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events
    }
}
