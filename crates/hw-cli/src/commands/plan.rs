//! Meeting-planner context export.
//!
//! Produces the document a planner consumes: labelled places, activity,
//! city, top merchants and allowed meeting hours.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hw_core::event::PLANNER_ACTIONS;
use hw_core::period::resolve_range;
use hw_core::planner::build_meeting_context;
use hw_core::{EventFilter, infer_places_and_activity};
use hw_db::Database;

use super::util::parse_client;
use crate::Config;

const TOP_MERCHANT_LIMIT: usize = 5;

/// Runs the plan-context command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    client: &str,
    period: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let client_id = parse_client(client)?;
    let range = resolve_range(
        Some(period),
        None,
        None,
        now,
        config.inference.default_period_days,
    );
    let filter = EventFilter::new(Vec::new(), &PLANNER_ACTIONS, range);

    let events = db
        .load_geo_events(&client_id, &filter)
        .context("failed to load geo events")?;
    let features = infer_places_and_activity(&events, &config.inference);
    let city = db.client_city(&client_id)?;
    let merchants = db
        .top_merchants(&client_id, &range, TOP_MERCHANT_LIMIT)
        .context("failed to aggregate merchants")?;

    let context = build_meeting_context(client_id, city, features, merchants);
    if context.need_clarification {
        tracing::info!(client = %context.client_id, "no confident place; planner must ask");
    }

    writeln!(writer, "{}", serde_json::to_string_pretty(&context)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hw_core::ClientId;
    use hw_db::{ClientCityRecord, GeoEventRecord, TransactionRecord};
    use serde_json::Value;

    fn client() -> ClientId {
        ClientId::new("900").unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
    }

    fn geo(id: &str, action: &str, day: u32, hour: u32) -> GeoEventRecord {
        GeoEventRecord {
            id: id.to_string(),
            client_id: client(),
            action: action.to_string(),
            latitude: Some(59.9311),
            longitude: Some(30.3609),
            timestamp: Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap(),
        }
    }

    fn run_json(db: &Database) -> Value {
        let mut out = Vec::new();
        run(&mut out, db, &Config::default(), "900", "30d", now()).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn context_uses_planner_actions_and_merchants() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_geo_events(&[geo("a", "app_open", 10, 11), geo("b", "view", 11, 12)])
            .unwrap();
        db.insert_transactions(&[TransactionRecord {
            id: "t1".to_string(),
            client_id: client(),
            posted_at: Utc.with_ymd_and_hms(2025, 3, 11, 13, 0, 0).unwrap(),
            merchant_name: Some("ВКУСВИЛЛ".to_string()),
            amount: 1_250.0,
            direction: "out".to_string(),
        }])
        .unwrap();
        db.upsert_client_cities(&[ClientCityRecord {
            client_id: client(),
            city: Some("Санкт-Петербург".to_string()),
        }])
        .unwrap();

        let json = run_json(&db);
        assert_eq!(json["client_id"], "900");
        assert_eq!(json["city"], "Санкт-Петербург");
        assert_eq!(json["places"][0]["type"], "work");
        assert_eq!(json["places"][0]["label"], "Работа");
        assert_eq!(json["top_merchants"][0]["name"], "ВКУСВИЛЛ");
        assert_eq!(json["top_merchants"][0]["share"], 1.0);
        assert_eq!(json["need_clarification"], false);
    }

    #[test]
    fn empty_history_requests_clarification() {
        let db = Database::open_in_memory().unwrap();
        let json = run_json(&db);
        assert_eq!(json["city"], "");
        assert_eq!(json["places"].as_array().unwrap().len(), 0);
        assert_eq!(json["need_clarification"], true);
        assert_eq!(json["constraints"]["meeting_hours_weekend"][0], "12:00-17:00");
    }
}
