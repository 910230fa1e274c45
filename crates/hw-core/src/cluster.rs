//! Grid-based mode clustering.
//!
//! # Algorithm Summary
//!
//! 1. Snap each point to a [`GridCell`] by rounding both coordinates to a
//!    fixed number of decimal digits
//! 2. Count points and track the latest timestamp per cell
//! 3. Pick the cell with the highest count; ties go to the most recently
//!    seen cell, then to the smallest `(lat, lon)`
//! 4. Report the winner's share of the subset as its confidence
//!
//! The result depends only on the multiset of input points, never on their
//! order.

use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::{InferenceConfig, MAX_ROUNDING_DIGITS};
use crate::types::{Confidence, PlaceKind};

/// A coordinate pair rounded to a fixed decimal precision.
///
/// Stored as scaled integers so equality and hashing are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    lat_key: i64,
    lon_key: i64,
    digits: u32,
}

impl GridCell {
    /// Snaps a coordinate pair to the grid, rounding half away from zero.
    ///
    /// `digits` above [`MAX_ROUNDING_DIGITS`] are clamped so keys never
    /// saturate.
    #[allow(clippy::cast_possible_truncation)]
    pub fn snap(latitude: f64, longitude: f64, digits: u32) -> Self {
        let digits = digits.min(MAX_ROUNDING_DIGITS);
        let scale = scale(digits);
        Self {
            lat_key: (latitude * scale).round() as i64,
            lon_key: (longitude * scale).round() as i64,
            digits,
        }
    }

    /// Latitude of the cell.
    #[allow(clippy::cast_precision_loss)]
    pub fn latitude(&self) -> f64 {
        self.lat_key as f64 / scale(self.digits)
    }

    /// Longitude of the cell.
    #[allow(clippy::cast_precision_loss)]
    pub fn longitude(&self) -> f64 {
        self.lon_key as f64 / scale(self.digits)
    }
}

fn scale(digits: u32) -> f64 {
    10_f64.powi(i32::try_from(digits).unwrap_or(i32::MAX))
}

/// A point reduced to what clustering needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatedPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Project-local timestamp.
    pub timestamp: DateTime<Tz>,
}

/// A home or work location estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceEstimate {
    #[serde(rename = "type")]
    pub kind: PlaceKind,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(rename = "radius_m")]
    pub radius_meters: u32,
    /// Share of the subset inside the winning cell.
    pub confidence: Confidence,
    /// Number of events in the winning cell.
    pub size: usize,
    /// Same value as `confidence`.
    pub share: Confidence,
    /// Local date of the most recent event in the winning cell.
    pub last_seen: Option<NaiveDate>,
}

#[derive(Debug)]
struct CellStats {
    count: usize,
    last_seen: DateTime<Tz>,
}

/// Finds the densest grid cell among `points`.
///
/// Returns `None` for an empty subset.
pub fn most_frequent_cell(
    points: &[LocatedPoint],
    kind: PlaceKind,
    config: &InferenceConfig,
) -> Option<PlaceEstimate> {
    let mut cells: HashMap<GridCell, CellStats> = HashMap::new();
    for point in points {
        let cell = GridCell::snap(point.latitude, point.longitude, config.rounding_digits);
        cells
            .entry(cell)
            .and_modify(|stats| {
                stats.count += 1;
                if point.timestamp > stats.last_seen {
                    stats.last_seen = point.timestamp;
                }
            })
            .or_insert(CellStats {
                count: 1,
                last_seen: point.timestamp,
            });
    }

    let (cell, stats) = cells.iter().max_by(|a, b| rank(a, b))?;
    let confidence = Confidence::share(stats.count, points.len());

    tracing::trace!(
        %kind,
        cells = cells.len(),
        size = stats.count,
        total = points.len(),
        "selected winning cell"
    );

    Some(PlaceEstimate {
        kind,
        latitude: cell.latitude(),
        longitude: cell.longitude(),
        radius_meters: config.place_radius_meters,
        confidence,
        size: stats.count,
        share: confidence,
        last_seen: Some(stats.last_seen.date_naive()),
    })
}

/// Orders candidate cells so that the preferred one compares greatest.
fn rank(a: &(&GridCell, &CellStats), b: &(&GridCell, &CellStats)) -> Ordering {
    let (cell_a, stats_a) = a;
    let (cell_b, stats_b) = b;
    stats_a
        .count
        .cmp(&stats_b.count)
        .then_with(|| stats_a.last_seen.cmp(&stats_b.last_seen))
        .then_with(|| {
            let key_a = (cell_a.lat_key, cell_a.lon_key);
            let key_b = (cell_b.lat_key, cell_b.lon_key);
            Reverse(key_a).cmp(&Reverse(key_b))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(lat: f64, lon: f64, day: u32, hour: u32) -> LocatedPoint {
        LocatedPoint {
            latitude: lat,
            longitude: lon,
            timestamp: Tz::UTC.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap(),
        }
    }

    fn config() -> InferenceConfig {
        InferenceConfig::default()
    }

    #[test]
    fn empty_subset_has_no_place() {
        assert!(most_frequent_cell(&[], PlaceKind::Home, &config()).is_none());
    }

    #[test]
    fn snapping_merges_nearby_points() {
        let a = GridCell::snap(59.934_31, 30.335_09, 4);
        let b = GridCell::snap(59.934_349, 30.335_149, 4);
        assert_eq!(a, b);
        assert_ne!(a, GridCell::snap(59.934_36, 30.3351, 4));
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "cell coordinates are exact decimal quotients"
    )]
    fn cell_coordinates_are_rounded_values() {
        let cell = GridCell::snap(59.934_312, 30.335_088, 4);
        assert_eq!(cell.latitude(), 59.9343);
        assert_eq!(cell.longitude(), 30.3351);

        let cell = GridCell::snap(-33.868_86, 151.209_29, 2);
        assert_eq!(cell.latitude(), -33.87);
        assert_eq!(cell.longitude(), 151.21);
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "exact shares of small integers")]
    fn densest_cell_wins_with_share_confidence() {
        let points = vec![
            point(59.9343, 30.3351, 10, 22),
            point(59.9343, 30.3351, 11, 23),
            point(59.9343, 30.3351, 12, 6),
            point(59.8661, 30.3215, 12, 7),
        ];
        let place = most_frequent_cell(&points, PlaceKind::Home, &config()).unwrap();
        assert_eq!(place.kind, PlaceKind::Home);
        assert_eq!(place.latitude, 59.9343);
        assert_eq!(place.longitude, 30.3351);
        assert_eq!(place.size, 3);
        assert_eq!(place.confidence.value(), 0.75);
        assert_eq!(place.share, place.confidence);
        assert_eq!(place.radius_meters, 300);
        assert_eq!(place.last_seen, NaiveDate::from_ymd_opt(2025, 3, 12));
    }

    #[test]
    fn excessive_precision_keeps_distant_points_apart() {
        let config = InferenceConfig {
            rounding_digits: 19,
            ..config()
        };
        let points = vec![point(59.9343, 30.3351, 10, 22), point(10.0, 120.0, 10, 23)];
        let place = most_frequent_cell(&points, PlaceKind::Home, &config).unwrap();
        assert_eq!(place.size, 1);
        assert!((place.confidence.value() - 0.5).abs() < 1e-9);
        assert!((place.latitude - 10.0).abs() < 1e-9);
        assert!((place.longitude - 120.0).abs() < 1e-9);
    }

    #[test]
    fn snap_clamps_precision() {
        let (lat, lon) = (84.999_999_999, -179.999_999_999);
        let fine = GridCell::snap(lat, lon, 30);
        assert_eq!(fine, GridCell::snap(lat, lon, MAX_ROUNDING_DIGITS));
        assert!((fine.longitude() - lon).abs() < 1e-6);
    }

    #[test]
    fn tie_prefers_most_recent_cell() {
        let points = vec![
            point(59.9343, 30.3351, 10, 22),
            point(59.8661, 30.3215, 11, 22),
        ];
        let place = most_frequent_cell(&points, PlaceKind::Home, &config()).unwrap();
        assert!((place.latitude - 59.8661).abs() < 1e-9);
    }

    #[test]
    fn tie_with_equal_recency_prefers_smallest_coordinates() {
        let points = vec![
            point(59.9343, 30.3351, 10, 22),
            point(59.8661, 30.3215, 10, 22),
            point(59.8661, 30.1000, 10, 22),
        ];
        let place = most_frequent_cell(&points, PlaceKind::Work, &config()).unwrap();
        assert!((place.latitude - 59.8661).abs() < 1e-9);
        assert!((place.longitude - 30.1).abs() < 1e-9);
    }

    #[test]
    fn result_is_independent_of_input_order() {
        let mut points = vec![
            point(59.9343, 30.3351, 10, 22),
            point(59.8661, 30.3215, 11, 22),
            point(59.9343, 30.3351, 12, 23),
            point(60.0089, 30.2588, 13, 1),
            point(59.8661, 30.3215, 13, 2),
        ];
        let forward = most_frequent_cell(&points, PlaceKind::Home, &config());
        points.reverse();
        let backward = most_frequent_cell(&points, PlaceKind::Home, &config());
        assert_eq!(forward, backward);
        assert_eq!(forward, most_frequent_cell(&points, PlaceKind::Home, &config()));
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let points = [point(59.9343, 30.3351, 10, 22)];
        let place = most_frequent_cell(&points, PlaceKind::Home, &config()).unwrap();
        let json = serde_json::to_value(&place).unwrap();
        assert_eq!(json["type"], "home");
        assert_eq!(json["lat"], 59.9343);
        assert_eq!(json["lon"], 30.3351);
        assert_eq!(json["radius_m"], 300);
        assert_eq!(json["confidence"], 1.0);
        assert_eq!(json["size"], 1);
        assert_eq!(json["last_seen"], "2025-03-10");
    }
}
