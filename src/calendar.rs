//! Local calendar for the mosque's fixed timezone.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use mockable::Clock;

/// Shortest TTL handed out, so an entry written right at midnight still lives.
const MIN_TTL_SECONDS: i64 = 60;

#[derive(Clone)]
pub struct LocalCalendar {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl LocalCalendar {
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self { clock, offset }
    }

    /// Build a calendar for a whole-hour UTC offset such as WIB (+7).
    pub fn with_offset_hours(clock: Arc<dyn Clock>, hours: i32) -> anyhow::Result<Self> {
        let offset = FixedOffset::east_opt(hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("invalid UTC offset: {} hours", hours))?;
        Ok(Self::new(clock, offset))
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.utc().with_timezone(&self.offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Time left until the next local midnight.
    pub fn until_midnight(&self) -> Duration {
        let now = self.now();
        let remaining = match now.date_naive().succ_opt() {
            Some(tomorrow) => tomorrow.and_time(chrono::NaiveTime::MIN) - now.naive_local(),
            None => Duration::zero(),
        };
        remaining.max(Duration::seconds(MIN_TTL_SECONDS))
    }
}


#[cfg(test)]
mod tests {
    use super::test_clock::FixedClock;
    use super::*;

    fn calendar_at(rfc3339: &str) -> LocalCalendar {
        LocalCalendar::with_offset_hours(Arc::new(FixedClock::at(rfc3339)), 7).unwrap()
    }

    #[test]
    fn test_today_uses_local_offset() {
        // 18:30 UTC is already the next day in WIB
        let calendar = calendar_at("2026-10-16T18:30:00Z");
        assert_eq!(calendar.today(), NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
    }

    #[test]
    fn test_until_midnight() {
        // 22:00 WIB
        let calendar = calendar_at("2026-10-17T15:00:00Z");
        assert_eq!(calendar.until_midnight(), Duration::hours(2));
    }

    #[test]
    fn test_until_midnight_has_floor() {
        // 23:59:50 WIB
        let calendar = calendar_at("2026-10-17T16:59:50Z");
        assert_eq!(calendar.until_midnight(), Duration::seconds(MIN_TTL_SECONDS));
    }

    #[test]
    fn test_invalid_offset() {
        let clock = Arc::new(FixedClock::at("2026-10-17T00:00:00Z"));
        assert!(LocalCalendar::with_offset_hours(clock, 30).is_err());
    }
}
