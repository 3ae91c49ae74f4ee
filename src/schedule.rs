//! Prayer schedule values and the small amount of time arithmetic around them.

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Minutes between the Friday prayer and Dzuhur when no manual time is set.
pub const JUMAT_OFFSET_MINUTES: i64 = 30;

/// Friday time used when Dzuhur cannot be parsed.
pub const DEFAULT_JUMAT: &str = "11:30";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid time '{0}', expected HH:MM")]
pub struct TimeParseError(pub String);

/// The day's times as reported by an external provider, without `jumat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTimes {
    pub imsak: String,
    pub subuh: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<String>,
    pub dzuhur: String,
    pub ashar: String,
    pub maghrib: String,
    pub isya: String,
}

impl DailyTimes {
    /// Hardcoded schedule for the mosque's location.
    pub fn defaults() -> Self {
        Self {
            imsak: "04:20".to_string(),
            subuh: "04:30".to_string(),
            sunrise: None,
            dzuhur: "12:00".to_string(),
            ashar: "15:15".to_string(),
            maghrib: "18:00".to_string(),
            isya: "19:15".to_string(),
        }
    }
}

/// Which tier produced the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleSource {
    MyQuran,
    Aladhan,
    Database,
    Default,
}

impl ScheduleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleSource::MyQuran => "myquran",
            ScheduleSource::Aladhan => "aladhan",
            ScheduleSource::Database => "database",
            ScheduleSource::Default => "default",
        }
    }
}

impl std::fmt::Display for ScheduleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JumatSource {
    Manual,
    Auto,
}

/// A successful external fetch; this is also what the daily cache holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSchedule {
    pub times: DailyTimes,
    pub source: ScheduleSource,
}

/// Composite schedule handed back to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrayerTimes {
    #[serde(flatten)]
    pub daily: DailyTimes,
    pub jumat: String,
}

/// Parse a strict `HH:MM` 24-hour value.
pub fn parse_time(value: &str) -> Result<NaiveTime, TimeParseError> {
    let invalid = || TimeParseError(value.to_string());
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(invalid());
    }
    let (hour, minute) = (&value[..2], &value[3..]);
    if !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

pub fn format_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Derive the Friday prayer time from Dzuhur, wrapping across midnight.
///
/// Falls back to [`DEFAULT_JUMAT`] when `dzuhur` is not a valid time.
pub fn auto_jumat(dzuhur: &str) -> String {
    match parse_time(dzuhur.trim()) {
        Ok(time) => {
            let (jumat, _) = time.overflowing_sub_signed(Duration::minutes(JUMAT_OFFSET_MINUTES));
            format_time(jumat)
        }
        Err(e) => {
            warn!("Cannot derive Jumat time, using {}: {}", DEFAULT_JUMAT, e);
            DEFAULT_JUMAT.to_string()
        }
    }
}

/// Drop a trailing parenthesized annotation such as `" (WIB)"`.
pub fn strip_annotation(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.find('(') {
        Some(idx) if trimmed.ends_with(')') => trimmed[..idx].trim().to_string(),
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse_time_tests {
        use super::*;

        #[test]
        fn test_valid_times() {
            assert_eq!(parse_time("00:00").unwrap(), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
            assert_eq!(parse_time("04:19").unwrap(), NaiveTime::from_hms_opt(4, 19, 0).unwrap());
            assert_eq!(parse_time("23:59").unwrap(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        }

        #[test]
        fn test_rejects_malformed_times() {
            for value in ["", "4:30", "04:3", "24:00", "12:60", "12-00", "ab:cd", "12:00:00", " 12:00", "+1:00"] {
                assert!(parse_time(value).is_err(), "expected '{}' to be rejected", value);
            }
        }

        #[test]
        fn test_error_names_value() {
            let err = parse_time("noon").unwrap_err();
            assert_eq!(err.to_string(), "invalid time 'noon', expected HH:MM");
        }
    }

    mod auto_jumat_tests {
        use super::*;

        #[test]
        fn test_thirty_minutes_before_dzuhur() {
            assert_eq!(auto_jumat("12:00"), "11:30");
            assert_eq!(auto_jumat("11:52"), "11:22");
            assert_eq!(auto_jumat("12:29"), "11:59");
        }

        #[test]
        fn test_wraps_across_midnight() {
            assert_eq!(auto_jumat("00:10"), "23:40");
            assert_eq!(auto_jumat("00:30"), "00:00");
        }

        #[test]
        fn test_surrounding_whitespace_is_ignored() {
            assert_eq!(auto_jumat(" 12:00 "), "11:30");
        }

        #[test]
        fn test_unparseable_dzuhur_uses_default() {
            assert_eq!(auto_jumat(""), DEFAULT_JUMAT);
            assert_eq!(auto_jumat("noon"), DEFAULT_JUMAT);
            assert_eq!(auto_jumat("25:00"), DEFAULT_JUMAT);
        }
    }

    mod strip_annotation_tests {
        use super::*;

        #[test]
        fn test_strips_timezone_suffix() {
            assert_eq!(strip_annotation("04:19 (WIB)"), "04:19");
            assert_eq!(strip_annotation("  11:52 (+07)  "), "11:52");
        }

        #[test]
        fn test_plain_value_is_trimmed() {
            assert_eq!(strip_annotation("04:19"), "04:19");
            assert_eq!(strip_annotation(" 04:19 "), "04:19");
        }

        #[test]
        fn test_unclosed_parenthesis_is_kept() {
            assert_eq!(strip_annotation("04:19 (WIB"), "04:19 (WIB");
        }
    }

    #[test]
    fn test_source_serialization() {
        assert_eq!(serde_json::to_string(&ScheduleSource::MyQuran).unwrap(), "\"myquran\"");
        assert_eq!(serde_json::to_string(&ScheduleSource::Default).unwrap(), "\"default\"");
        assert_eq!(serde_json::to_string(&JumatSource::Manual).unwrap(), "\"manual\"");
        assert_eq!(ScheduleSource::Aladhan.to_string(), "aladhan");
    }

    #[test]
    fn test_prayer_times_flattens_daily_fields() {
        let times = PrayerTimes {
            daily: DailyTimes::defaults(),
            jumat: "11:30".to_string(),
        };

        let value = serde_json::to_value(&times).unwrap();
        assert_eq!(value["subuh"], "04:30");
        assert_eq!(value["jumat"], "11:30");
        assert!(value.get("sunrise").is_none());
    }
}
