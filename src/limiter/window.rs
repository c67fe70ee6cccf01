use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Time unit defining one replenishment window. A window is always exactly one unit long.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WindowUnit {
    #[serde(alias = "nanos", alias = "ns")]
    Nanoseconds,
    #[serde(alias = "micros", alias = "us")]
    Microseconds,
    #[serde(alias = "millis", alias = "ms")]
    Milliseconds,
    #[serde(alias = "secs", alias = "s")]
    Seconds,
    #[serde(alias = "mins", alias = "m")]
    Minutes,
    #[serde(alias = "h")]
    Hours,
    #[serde(alias = "half_days", alias = "halfday")]
    HalfDays,
    #[serde(alias = "d")]
    Days,
}

impl WindowUnit {
    pub fn duration(self) -> Duration {
        match self {
            WindowUnit::Nanoseconds => Duration::from_nanos(1),
            WindowUnit::Microseconds => Duration::from_micros(1),
            WindowUnit::Milliseconds => Duration::from_millis(1),
            WindowUnit::Seconds => Duration::from_secs(1),
            WindowUnit::Minutes => Duration::from_secs(60),
            WindowUnit::Hours => Duration::from_secs(60 * 60),
            WindowUnit::HalfDays => Duration::from_secs(12 * 60 * 60),
            WindowUnit::Days => Duration::from_secs(24 * 60 * 60),
        }
    }

    fn name(self) -> &'static str {
        match self {
            WindowUnit::Nanoseconds => "nanoseconds",
            WindowUnit::Microseconds => "microseconds",
            WindowUnit::Milliseconds => "milliseconds",
            WindowUnit::Seconds => "seconds",
            WindowUnit::Minutes => "minutes",
            WindowUnit::Hours => "hours",
            WindowUnit::HalfDays => "halfdays",
            WindowUnit::Days => "days",
        }
    }
}

impl fmt::Display for WindowUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "nanoseconds" | "nanos" | "ns" => WindowUnit::Nanoseconds,
            "microseconds" | "micros" | "us" => WindowUnit::Microseconds,
            "milliseconds" | "millis" | "ms" => WindowUnit::Milliseconds,
            "seconds" | "secs" | "s" => WindowUnit::Seconds,
            "minutes" | "mins" | "m" => WindowUnit::Minutes,
            "hours" | "h" => WindowUnit::Hours,
            "halfdays" | "half_days" | "halfday" => WindowUnit::HalfDays,
            "days" | "d" => WindowUnit::Days,
            other => return Err(format!("Unknown window unit: {}", other)),
        };
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_one_unit_long() {
        assert_eq!(WindowUnit::Milliseconds.duration(), Duration::from_millis(1));
        assert_eq!(WindowUnit::Seconds.duration(), Duration::from_secs(1));
        assert_eq!(WindowUnit::Minutes.duration(), Duration::from_secs(60));
        assert_eq!(WindowUnit::HalfDays.duration(), Duration::from_secs(43_200));
        assert_eq!(WindowUnit::Days.duration(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_parse_window_unit() {
        assert_eq!("seconds".parse::<WindowUnit>().unwrap(), WindowUnit::Seconds);
        assert_eq!(" MINUTES ".parse::<WindowUnit>().unwrap(), WindowUnit::Minutes);
        assert_eq!("ms".parse::<WindowUnit>().unwrap(), WindowUnit::Milliseconds);
        assert!("fortnights".parse::<WindowUnit>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let unit = WindowUnit::HalfDays;
        assert_eq!(unit.to_string().parse::<WindowUnit>().unwrap(), unit);
    }
}
