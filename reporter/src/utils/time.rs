//! Time units and clock helpers

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Granularity used for write precision, duration conversion and rate conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[serde(alias = "ns", alias = "n")]
    Nanoseconds,
    #[serde(alias = "us", alias = "u")]
    Microseconds,
    #[default]
    #[serde(alias = "ms")]
    Milliseconds,
    #[serde(alias = "s")]
    Seconds,
    #[serde(alias = "m")]
    Minutes,
    #[serde(alias = "h")]
    Hours,
}

impl TimeUnit {
    /// Length of one unit in nanoseconds
    pub const fn nanos(self) -> i64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Minutes => 60_000_000_000,
            TimeUnit::Hours => 3_600_000_000_000,
        }
    }

    /// Convert epoch milliseconds into this unit.
    ///
    /// Coarser units truncate toward zero, finer units multiply.
    pub fn from_millis(self, millis: i64) -> i64 {
        match self {
            TimeUnit::Nanoseconds => millis.saturating_mul(1_000_000),
            TimeUnit::Microseconds => millis.saturating_mul(1_000),
            TimeUnit::Milliseconds => millis,
            TimeUnit::Seconds => millis / 1_000,
            TimeUnit::Minutes => millis / 60_000,
            TimeUnit::Hours => millis / 3_600_000,
        }
    }

    /// Value of the `precision` query parameter on the write endpoint
    pub fn precision(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "n",
            TimeUnit::Microseconds => "u",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
        }
    }

    /// Express a duration measured in nanoseconds in this unit
    pub fn convert_duration(self, nanos: f64) -> f64 {
        nanos / self.nanos() as f64
    }

    /// Express a per-second rate as a rate per this unit
    pub fn convert_rate(self, per_second: f64) -> f64 {
        per_second * (self.nanos() as f64 / 1e9)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "nanoseconds",
            TimeUnit::Microseconds => "microseconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nanoseconds" | "ns" | "n" => Ok(TimeUnit::Nanoseconds),
            "microseconds" | "us" | "u" => Ok(TimeUnit::Microseconds),
            "milliseconds" | "ms" => Ok(TimeUnit::Milliseconds),
            "seconds" | "s" => Ok(TimeUnit::Seconds),
            "minutes" | "m" => Ok(TimeUnit::Minutes),
            "hours" | "h" => Ok(TimeUnit::Hours),
            _ => Err(format!(
                "Invalid time unit '{}'. Valid options: ns, us, ms, s, m, h",
                s
            )),
        }
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis_truncates_coarse_units() {
        assert_eq!(TimeUnit::Seconds.from_millis(1_999), 1);
        assert_eq!(TimeUnit::Minutes.from_millis(119_999), 1);
        assert_eq!(TimeUnit::Hours.from_millis(3_600_000), 1);
        assert_eq!(TimeUnit::Milliseconds.from_millis(1_234), 1_234);
    }

    #[test]
    fn test_from_millis_scales_fine_units() {
        assert_eq!(TimeUnit::Microseconds.from_millis(3), 3_000);
        assert_eq!(TimeUnit::Nanoseconds.from_millis(3), 3_000_000);
    }

    #[test]
    fn test_precision_strings() {
        assert_eq!(TimeUnit::Nanoseconds.precision(), "n");
        assert_eq!(TimeUnit::Microseconds.precision(), "u");
        assert_eq!(TimeUnit::Milliseconds.precision(), "ms");
        assert_eq!(TimeUnit::Seconds.precision(), "s");
        assert_eq!(TimeUnit::Minutes.precision(), "m");
        assert_eq!(TimeUnit::Hours.precision(), "h");
    }

    #[test]
    fn test_duration_and_rate_conversion() {
        assert_eq!(TimeUnit::Milliseconds.convert_duration(2_500_000.0), 2.5);
        assert_eq!(TimeUnit::Seconds.convert_duration(1e9), 1.0);
        assert_eq!(TimeUnit::Seconds.convert_rate(3.0), 3.0);
        assert_eq!(TimeUnit::Minutes.convert_rate(1.0), 60.0);
    }

    #[test]
    fn test_parse_and_serde() {
        assert_eq!("ms".parse::<TimeUnit>().unwrap(), TimeUnit::Milliseconds);
        assert_eq!("Minutes".parse::<TimeUnit>().unwrap(), TimeUnit::Minutes);
        assert!("fortnights".parse::<TimeUnit>().is_err());

        let unit: TimeUnit = serde_json::from_str(r#""s""#).unwrap();
        assert_eq!(unit, TimeUnit::Seconds);
        let unit: TimeUnit = serde_json::from_str(r#""hours""#).unwrap();
        assert_eq!(unit, TimeUnit::Hours);
    }
}
