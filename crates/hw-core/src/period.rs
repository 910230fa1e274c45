//! Period presets and time-window resolution.
//!
//! Presets (`7d`, `30d`, `90d`, `all`) override explicit bounds. Anything
//! unrecognised falls back to explicit bounds, then to the default lookback.
//! Resolution never fails.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Naive date-time layouts accepted for explicit bounds.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A coarse relative-time window keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// The last N days up to now.
    Days(u32),
    /// No time bound at all.
    All,
}

impl Period {
    /// Parses a preset keyword. Only `7d`, `30d`, `90d` and `all` are recognised.
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim)? {
            "7d" => Some(Self::Days(7)),
            "30d" => Some(Self::Days(30)),
            "90d" => Some(Self::Days(90)),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// An inclusive time range; a missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// A range with neither bound set.
    pub const UNBOUNDED: Self = Self {
        from: None,
        to: None,
    };

    /// The last `days` days ending at `now`.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            from: Some(now - Duration::days(i64::from(days))),
            to: Some(now),
        }
    }

    /// Whether `timestamp` lies inside the range (both ends inclusive).
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| timestamp >= from) && self.to.is_none_or(|to| timestamp <= to)
    }
}

/// Resolves the admitted time window for a query.
///
/// A recognised preset wins over `from`/`to`. Otherwise explicit bounds are
/// used when at least one is present, and the last `default_days` days
/// when neither is.
pub fn resolve_range(
    period: Option<&str>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    default_days: u32,
) -> TimeRange {
    match Period::parse(period) {
        Some(Period::Days(days)) => TimeRange::last_days(days, now),
        Some(Period::All) => TimeRange::UNBOUNDED,
        None if from.is_some() || to.is_some() => TimeRange { from, to },
        None => TimeRange::last_days(default_days, now),
    }
}

/// Parses `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS[.f]]` or RFC 3339.
///
/// Values without an offset are interpreted in `tz`; a bare date means
/// local midnight. Blank or malformed input yields `None`.
pub fn parse_local_datetime(value: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(localize(naive, tz));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|date| localize(date.and_time(NaiveTime::MIN), tz))
}

/// Attaches `tz` to a naive local time.
/// DST ambiguity picks the earlier instant; a skipped local time moves forward one hour.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map_or_else(|| shifted.and_utc(), |dt| dt.with_timezone(&Utc))
        }
    }
}
