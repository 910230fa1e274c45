//! Context handed to the meeting planner.
//!
//! The planner itself lives outside this crate; this module only shapes
//! inferred places, activity and spending into the document it consumes.

use serde::Serialize;

use crate::activity::ActivityProfile;
use crate::cluster::PlaceEstimate;
use crate::places::HomeWorkFeatures;
use crate::types::{ClientId, PlaceKind};

const WEEKDAY_MEETING_HOURS: [&str; 2] = ["10:00-13:00", "16:00-19:00"];
const WEEKEND_MEETING_HOURS: [&str; 1] = ["12:00-17:00"];

/// Display label for a place kind.
pub const fn place_label(kind: Option<PlaceKind>) -> &'static str {
    match kind {
        Some(PlaceKind::Home) => "Дом",
        Some(PlaceKind::Work) => "Работа",
        None => "Место",
    }
}

/// A place estimate with its display label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledPlace {
    #[serde(flatten)]
    pub place: PlaceEstimate,
    pub label: &'static str,
}

/// Aggregated outgoing spend at one merchant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantSpend {
    pub name: String,
    pub amount: f64,
    pub ops: u64,
    /// Fraction of the client's total outgoing spend.
    pub share: f64,
}

/// Allowed meeting hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeetingConstraints {
    pub meeting_hours_weekday: Vec<String>,
    pub meeting_hours_weekend: Vec<String>,
}

impl Default for MeetingConstraints {
    fn default() -> Self {
        Self {
            meeting_hours_weekday: WEEKDAY_MEETING_HOURS.iter().map(ToString::to_string).collect(),
            meeting_hours_weekend: WEEKEND_MEETING_HOURS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Everything the planner needs to propose meeting slots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingContext {
    pub client_id: ClientId,
    /// Empty when the client's city is unknown.
    pub city: String,
    pub places: Vec<LabeledPlace>,
    pub activity: ActivityProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_hour: Option<usize>,
    pub top_merchants: Vec<MerchantSpend>,
    pub constraints: MeetingConstraints,
    /// No confident place was found; the planner must ask instead of scheduling.
    pub need_clarification: bool,
}

/// Assembles planner context from inference output and spending aggregates.
pub fn build_meeting_context(
    client_id: ClientId,
    city: Option<String>,
    features: HomeWorkFeatures,
    top_merchants: Vec<MerchantSpend>,
) -> MeetingContext {
    let places: Vec<LabeledPlace> = features
        .places
        .into_iter()
        .map(|place| LabeledPlace {
            label: place_label(Some(place.kind)),
            place,
        })
        .collect();
    let need_clarification = places.is_empty();

    MeetingContext {
        client_id,
        city: city.unwrap_or_default(),
        places,
        peak_hour: features.activity.peak_hour(),
        activity: features.activity,
        top_merchants,
        constraints: MeetingConstraints::default(),
        need_clarification,
    }
}

/// Computes per-merchant shares of `total` outgoing spend.
pub fn merchant_shares(rows: Vec<(String, f64, u64)>, total: f64) -> Vec<MerchantSpend> {
    rows.into_iter()
        .map(|(name, amount, ops)| MerchantSpend {
            share: if total > 0.0 { amount / total } else { 0.0 },
            name,
            amount,
            ops,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::config::InferenceConfig;
    use crate::event::GeoEvent;
    use crate::places::infer_places_and_activity;

    fn client() -> ClientId {
        ClientId::new("42").unwrap()
    }

    fn night_events() -> Vec<GeoEvent> {
        [10, 11]
            .into_iter()
            .map(|day| GeoEvent {
                client_id: client(),
                action: "app_open".to_string(),
                latitude: 59.9343,
                longitude: 30.3351,
                timestamp: Utc.with_ymd_and_hms(2025, 3, day, 22, 0, 0).unwrap(),
            })
            .collect()
    }

    #[test]
    fn labels_places_and_keeps_activity() {
        let features = infer_places_and_activity(&night_events(), &InferenceConfig::default());
        let city = Some("Санкт-Петербург".to_string());
        let ctx = build_meeting_context(client(), city, features, vec![]);

        assert_eq!(ctx.places.len(), 1);
        assert_eq!(ctx.places[0].label, "Дом");
        assert_eq!(ctx.city, "Санкт-Петербург");
        assert_eq!(ctx.peak_hour, Some(22));
        assert!(!ctx.need_clarification);
    }

    #[test]
    fn missing_places_request_clarification() {
        let ctx = build_meeting_context(client(), None, HomeWorkFeatures::default(), vec![]);
        assert!(ctx.need_clarification);
        assert_eq!(ctx.city, "");
        assert_eq!(ctx.peak_hour, None);
        assert_eq!(ctx.constraints.meeting_hours_weekday, vec!["10:00-13:00", "16:00-19:00"]);
        assert_eq!(ctx.constraints.meeting_hours_weekend, vec!["12:00-17:00"]);
    }

    #[test]
    fn labels_cover_every_kind() {
        assert_eq!(place_label(Some(PlaceKind::Work)), "Работа");
        assert_eq!(place_label(None), "Место");
    }

    #[test]
    fn serialized_place_is_flattened_with_label() {
        let features = infer_places_and_activity(&night_events(), &InferenceConfig::default());
        let ctx = build_meeting_context(client(), None, features, vec![]);
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["client_id"], "42");
        assert_eq!(json["places"][0]["type"], "home");
        assert_eq!(json["places"][0]["label"], "Дом");
        assert_eq!(json["places"][0]["radius_m"], 300);
    }

    #[test]
    fn merchant_shares_handle_zero_total() {
        let rows = vec![("OZON".to_string(), 300.0, 2), ("METRO".to_string(), 100.0, 1)];
        let shares = merchant_shares(rows.clone(), 400.0);
        assert!((shares[0].share - 0.75).abs() < 1e-9);
        assert!((shares[1].share - 0.25).abs() < 1e-9);

        let shares = merchant_shares(rows, 0.0);
        assert!(shares.iter().all(|m| m.share.abs() < f64::EPSILON));
    }
}
