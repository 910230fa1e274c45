//! Hour-of-day and day-of-week histograms.

use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Event counts per local hour and per local weekday (Monday = index 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityProfile {
    pub hourly: [u32; 24],
    pub weekday: [u32; 7],
}

impl Default for ActivityProfile {
    fn default() -> Self {
        Self {
            hourly: [0; 24],
            weekday: [0; 7],
        }
    }
}

impl ActivityProfile {
    /// Counts one event at its local hour and weekday.
    pub fn record(&mut self, local: &DateTime<Tz>) {
        self.hourly[local.hour() as usize] += 1;
        self.weekday[local.weekday().num_days_from_monday() as usize] += 1;
    }

    /// Total number of recorded events.
    pub fn total(&self) -> u32 {
        self.hourly.iter().sum()
    }

    /// Local hour with the most events, if any were recorded.
    pub fn peak_hour(&self) -> Option<usize> {
        if self.total() == 0 {
            return None;
        }
        // Earliest hour wins ties.
        self.hourly
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
            .map(|(hour, _)| hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn records_local_hour_and_weekday() {
        let mut profile = ActivityProfile::default();
        // 2025-03-15 is a Saturday.
        profile.record(&Tz::UTC.with_ymd_and_hms(2025, 3, 15, 13, 5, 0).unwrap());
        profile.record(&Tz::UTC.with_ymd_and_hms(2025, 3, 10, 13, 59, 0).unwrap());

        assert_eq!(profile.hourly[13], 2);
        assert_eq!(profile.weekday[5], 1);
        assert_eq!(profile.weekday[0], 1);
        assert_eq!(profile.total(), 2);
        assert_eq!(profile.weekday.iter().sum::<u32>(), 2);
    }

    #[test]
    fn uses_timezone_of_the_timestamp() {
        let mut profile = ActivityProfile::default();
        let utc = chrono::Utc.with_ymd_and_hms(2025, 3, 9, 22, 30, 0).unwrap();
        // Sunday 22:30 UTC is Monday 01:30 in Moscow.
        profile.record(&utc.with_timezone(&chrono_tz::Europe::Moscow));
        assert_eq!(profile.hourly[1], 1);
        assert_eq!(profile.weekday[0], 1);
    }

    #[test]
    fn peak_hour_prefers_earliest_on_tie() {
        let mut profile = ActivityProfile::default();
        assert_eq!(profile.peak_hour(), None);
        profile.hourly[9] = 3;
        profile.hourly[18] = 3;
        profile.hourly[12] = 1;
        assert_eq!(profile.peak_hour(), Some(9));
    }

    #[test]
    fn serializes_as_fixed_arrays() {
        let json = serde_json::to_value(ActivityProfile::default()).unwrap();
        assert_eq!(json["hourly"].as_array().unwrap().len(), 24);
        assert_eq!(json["weekday"].as_array().unwrap().len(), 7);
    }
}
