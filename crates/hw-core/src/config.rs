//! Tunable parameters for place inference.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

/// Finest supported grid precision. At 10^9 every valid longitude still
/// fits a scaled `i64` key.
pub const MAX_ROUNDING_DIGITS: u32 = 9;

/// Configuration for home/work inference.
///
/// Passed explicitly into every inference call; the core keeps no global
/// timezone or threshold state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Timezone used for all hour-of-day and weekday decisions.
    /// Default: UTC.
    pub timezone: Tz,

    /// First hour (inclusive) of the night window. Default: 21.
    pub night_start_hour: u32,

    /// Hour (exclusive) at which the night window ends. Default: 8.
    ///
    /// When `night_start_hour > night_end_hour` the window wraps midnight.
    pub night_end_hour: u32,

    /// First workday hour (inclusive). Default: 9.
    pub workday_start_hour: u32,

    /// Workday hour upper bound (exclusive). Default: 18.
    pub workday_end_hour: u32,

    /// Decimal digits kept when snapping coordinates to grid cells.
    /// Default: 4 (~11 m at the equator).
    pub rounding_digits: u32,

    /// Radius reported on every place estimate. Default: 300.
    pub place_radius_meters: u32,

    /// Smallest winning cell accepted as a place. Default: 2.
    pub min_cluster_size: usize,

    /// Lookback used when no period or explicit bounds are given.
    /// Default: 30.
    pub default_period_days: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            night_start_hour: 21,
            night_end_hour: 8,
            workday_start_hour: 9,
            workday_end_hour: 18,
            rounding_digits: 4,
            place_radius_meters: 300,
            min_cluster_size: 2,
            default_period_days: 30,
        }
    }
}

impl InferenceConfig {
    /// Checks that every hour and precision setting is representable.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_hour("night_start_hour", self.night_start_hour, 23)?;
        check_hour("night_end_hour", self.night_end_hour, 24)?;
        check_hour("workday_start_hour", self.workday_start_hour, 23)?;
        check_hour("workday_end_hour", self.workday_end_hour, 24)?;
        if self.rounding_digits > MAX_ROUNDING_DIGITS {
            return Err(ValidationError::InvalidDigits(self.rounding_digits));
        }
        Ok(())
    }
}

const fn check_hour(field: &'static str, value: u32, max: u32) -> Result<(), ValidationError> {
    if value > max {
        return Err(ValidationError::InvalidHour { field, value, max });
    }
    Ok(())
}
