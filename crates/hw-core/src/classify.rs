//! Night and workday-hours predicates over project-local time.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::config::InferenceConfig;

/// Hour windows used to split events into night and workday subsets.
///
/// The two predicates are independent filters, not a partition: an event
/// may match neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindows {
    timezone: Tz,
    night_start: u32,
    night_end: u32,
    workday_start: u32,
    workday_end: u32,
}

impl TimeWindows {
    pub const fn from_config(config: &InferenceConfig) -> Self {
        Self {
            timezone: config.timezone,
            night_start: config.night_start_hour,
            night_end: config.night_end_hour,
            workday_start: config.workday_start_hour,
            workday_end: config.workday_end_hour,
        }
    }

    /// Converts an instant into the project timezone.
    pub fn local(&self, timestamp: DateTime<Utc>) -> DateTime<Tz> {
        timestamp.with_timezone(&self.timezone)
    }

    /// Whether the local hour falls in the night window.
    pub fn is_night(&self, local: &DateTime<Tz>) -> bool {
        let hour = local.hour();
        if self.night_start > self.night_end {
            hour >= self.night_start || hour < self.night_end
        } else {
            hour >= self.night_start && hour < self.night_end
        }
    }

    /// Whether the local time is Monday to Friday within workday hours.
    pub fn is_workday(&self, local: &DateTime<Tz>) -> bool {
        let weekend = matches!(local.weekday(), Weekday::Sat | Weekday::Sun);
        let hour = local.hour();
        !weekend && hour >= self.workday_start && hour < self.workday_end
    }
}
