//! Home/work inference command.
//!
//! Output mirrors the home-work query endpoint:
//! `{home, work, features: {hourly_activity, weekday_activity, counts}}`.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hw_core::event::DEFAULT_ACTIONS;
use hw_core::{ClientId, EventCounts, EventFilter, HomeWorkFeatures, PlaceEstimate, infer_many};
use hw_db::Database;
use serde::Serialize;

use super::util::{parse_client, resolve_window};
use crate::Config;
use crate::cli::WindowArgs;

/// Inference result for one client.
#[derive(Debug, Serialize)]
pub struct HomeWorkResponse {
    pub client_id: ClientId,
    pub home: Option<PlaceEstimate>,
    pub work: Option<PlaceEstimate>,
    pub features: FeatureExport,
}

/// Histograms and subset sizes.
#[derive(Debug, Serialize)]
pub struct FeatureExport {
    pub hourly_activity: [u32; 24],
    pub weekday_activity: [u32; 7],
    pub counts: EventCounts,
}

impl HomeWorkResponse {
    fn new(client_id: ClientId, features: &HomeWorkFeatures) -> Self {
        Self {
            client_id,
            home: features.home().cloned(),
            work: features.work().cloned(),
            features: FeatureExport {
                hourly_activity: features.activity.hourly,
                weekday_activity: features.activity.weekday,
                counts: features.counts,
            },
        }
    }
}

/// Runs the homework command.
///
/// Events are loaded sequentially, then every client is inferred in parallel.
/// A single client prints one object; several print an array.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    clients: &[String],
    window: &WindowArgs,
    events: &[String],
    now: DateTime<Utc>,
) -> Result<()> {
    let range = resolve_window(window, &config.inference, now);
    let filter = EventFilter::new(events.to_vec(), &DEFAULT_ACTIONS, range);

    let mut batches = Vec::with_capacity(clients.len());
    for raw in clients {
        let client_id = parse_client(raw)?;
        let loaded = db
            .load_geo_events(&client_id, &filter)
            .with_context(|| format!("failed to load events for client {client_id}"))?;
        batches.push((client_id, loaded));
    }

    let responses: Vec<HomeWorkResponse> = infer_many(batches, &config.inference)
        .into_iter()
        .map(|(client_id, features)| HomeWorkResponse::new(client_id, &features))
        .collect();

    let output = match responses.as_slice() {
        [single] => serde_json::to_string_pretty(single)?,
        many => serde_json::to_string_pretty(many)?,
    };
    writeln!(writer, "{output}")?;
    Ok(())
}
