//! Wall-clock conversion boundary for schedule arithmetic.
//!
//! All "local time" handling happens here: a stored instant plus the
//! deployment offset becomes an explicit `(date, hour)` pair, and slot
//! computations go back the other way. The scheduler state machine never
//! does its own time-zone math.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};

/// Converts instants to local wall-clock fields and back.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    /// Offset from UTC in seconds.
    offset_secs: i32,
}

impl LocalClock {
    /// Build a clock for a whole-hour UTC offset. Offsets outside
    /// (-24, 24) are clamped to UTC.
    pub fn from_offset_hours(hours: i32) -> Self {
        let hours = if hours.abs() >= 24 { 0 } else { hours };
        Self {
            offset_secs: hours * 3600,
        }
    }

    pub fn utc() -> Self {
        Self { offset_secs: 0 }
    }

    /// Local calendar date and hour-of-day for an instant.
    pub fn wall(&self, instant: DateTime<Utc>) -> (NaiveDate, u32) {
        let local = instant + Duration::seconds(self.offset_secs as i64);
        (local.date_naive(), local.hour())
    }

    /// Local calendar date for an instant.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.wall(instant).0
    }

    /// The instant at which `date` reaches `hour:00` local time.
    /// Hours outside 0-23 are treated as midnight.
    pub fn at_hour(&self, date: NaiveDate, hour: u32) -> DateTime<Utc> {
        let naive = date
            .and_hms_opt(hour.min(23), 0, 0)
            .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
        Utc.from_utc_datetime(&(naive - Duration::seconds(self.offset_secs as i64)))
    }

    /// First `hour:00` local slot strictly after `after`.
    pub fn next_slot(&self, after: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
        let (date, _) = self.wall(after);
        let candidate = self.at_hour(date, hour);
        if candidate > after {
            candidate
        } else {
            self.at_hour(date + Duration::days(1), hour)
        }
    }

    /// The `hour:00` local slot `interval_days` after `from`'s local date.
    pub fn slot_after(&self, from: DateTime<Utc>, interval_days: u32, hour: u32) -> DateTime<Utc> {
        let (date, _) = self.wall(from);
        self.at_hour(date + Duration::days(interval_days as i64), hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn wall_applies_offset() {
        let clock = LocalClock::from_offset_hours(9);
        // 23:30 UTC is 08:30 next day at +09:00.
        let (date, hour) = clock.wall(utc("2026-03-01T23:30:00Z"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(hour, 8);
    }

    #[test]
    fn at_hour_round_trips() {
        let clock = LocalClock::from_offset_hours(9);
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let instant = clock.at_hour(date, 9);
        assert_eq!(instant, utc("2026-03-02T00:00:00Z"));
        assert_eq!(clock.wall(instant), (date, 9));
    }

    #[test]
    fn next_slot_today_when_hour_ahead() {
        let clock = LocalClock::utc();
        let after = utc("2026-03-01T07:15:00Z");
        assert_eq!(clock.next_slot(after, 9), utc("2026-03-01T09:00:00Z"));
    }

    #[test]
    fn next_slot_tomorrow_when_hour_passed() {
        let clock = LocalClock::utc();
        let after = utc("2026-03-01T09:00:00Z");
        // Strictly after: exactly 09:00 pushes to the next day.
        assert_eq!(clock.next_slot(after, 9), utc("2026-03-02T09:00:00Z"));
    }

    #[test]
    fn slot_after_adds_interval_days() {
        let clock = LocalClock::utc();
        let from = utc("2026-03-01T09:05:00Z");
        assert_eq!(clock.slot_after(from, 1, 9), utc("2026-03-02T09:00:00Z"));
        assert_eq!(clock.slot_after(from, 7, 6), utc("2026-03-08T06:00:00Z"));
    }

    #[test]
    fn invalid_offset_clamps_to_utc() {
        let clock = LocalClock::from_offset_hours(30);
        let instant = utc("2026-03-01T12:00:00Z");
        assert_eq!(clock.wall(instant).1, 12);
    }
}
