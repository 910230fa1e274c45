//! Shared utilities for CLI commands.

use anyhow::Context;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use hw_core::period::{parse_local_datetime, resolve_range};
use hw_core::{ClientId, InferenceConfig, TimeRange};

use crate::cli::WindowArgs;

/// Validates a client identifier from the command line.
pub fn parse_client(raw: &str) -> anyhow::Result<ClientId> {
    ClientId::new(raw.trim()).with_context(|| format!("invalid client id: {raw:?}"))
}

/// Resolves `--period`/`--from`/`--to` into an admitted time window.
///
/// Malformed bounds are ignored with a warning, which lets the default
/// lookback apply instead of failing the query.
pub fn resolve_window(
    args: &WindowArgs,
    config: &InferenceConfig,
    now: DateTime<Utc>,
) -> TimeRange {
    let from = parse_bound("--from", args.from.as_deref(), config.timezone);
    let to = parse_bound("--to", args.to.as_deref(), config.timezone);
    let range = resolve_range(
        args.period.as_deref(),
        from,
        to,
        now,
        config.default_period_days,
    );
    tracing::debug!(?range, period = ?args.period, "resolved query window");
    range
}

fn parse_bound(flag: &str, value: Option<&str>, tz: Tz) -> Option<DateTime<Utc>> {
    let value = value?;
    let parsed = parse_local_datetime(value, tz);
    if parsed.is_none() {
        tracing::warn!(flag, value, "ignoring unparseable datetime");
    }
    parsed
}
