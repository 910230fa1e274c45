//! Heat points for a single client's map layer.

use serde::Serialize;

use crate::event::GeoEvent;

/// Point cap used when the caller gives none.
pub const DEFAULT_POINT_LIMIT: usize = 20_000;
const MIN_POINT_LIMIT: usize = 1_000;
const MAX_POINT_LIMIT: usize = 100_000;

/// Clamps a requested point cap to `[1000, 100000]`.
pub fn clamp_limit(requested: Option<i64>) -> usize {
    requested.map_or(DEFAULT_POINT_LIMIT, |value| {
        usize::try_from(value)
            .unwrap_or(0)
            .clamp(MIN_POINT_LIMIT, MAX_POINT_LIMIT)
    })
}

/// `[lat, lon, weight]` triples plus truncation info.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub heat_points: Vec<[f64; 3]>,
    pub count: usize,
    /// Set when the cap was reached, so older points may be missing.
    pub truncated: bool,
}

/// Builds unit-weight heat points from events ordered most-recent-first.
pub fn heat_points(events: &[GeoEvent], limit: usize) -> Heatmap {
    let heat_points: Vec<[f64; 3]> = events
        .iter()
        .take(limit)
        .map(|e| [e.latitude, e.longitude, 1.0])
        .collect();
    let count = heat_points.len();
    Heatmap {
        heat_points,
        count,
        truncated: count >= limit,
    }
}
