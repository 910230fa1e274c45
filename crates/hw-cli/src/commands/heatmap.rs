//! Heat point export for one client or a debtor portfolio.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use hw_core::EventFilter;
use hw_core::event::HEATMAP_ACTIONS;
use hw_core::heatmap::{clamp_limit, heat_points};
use hw_db::{Database, DebtFilter};

use super::util::{parse_client, resolve_window};
use crate::Config;
use crate::cli::HeatmapArgs;

/// Runs the heatmap command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    args: &HeatmapArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let range = resolve_window(&args.window, &config.inference, now);
    let filter = EventFilter::new(args.events.clone(), &HEATMAP_ACTIONS, range);

    let loaded = if let Some(client) = &args.client {
        let client_id = parse_client(client)?;
        db.load_geo_events(&client_id, &filter)?
    } else {
        db.load_portfolio_geo_events(&debt_filter(args, now), &filter)
            .context("failed to load portfolio events")?
    };
    let map = heat_points(&loaded, clamp_limit(args.limit));
    tracing::debug!(count = map.count, truncated = map.truncated, "built heat points");

    writeln!(writer, "{}", serde_json::to_string_pretty(&map)?)?;
    Ok(())
}

fn debt_filter(args: &HeatmapArgs, now: DateTime<Utc>) -> DebtFilter {
    DebtFilter {
        min_amount: args.debt_min,
        max_amount: args.debt_max,
        buckets: args.buckets.clone(),
        npl: args.npl.map(|flag| flag == 1),
        last_event_since: args
            .last_login_days
            .map(|days| now - Duration::days(i64::from(days))),
    }
}
