//! Domain time types and the injectable clock.
//!
//! The scheduler and proxy both need "current time" but must never read it
//! directly from the OS — tests inject a [`FixedClock`] instead, the same
//! way `pi-inky-weather-epd` injects a `FixedClock` so its dashboard
//! snapshot tests don't depend on wall-clock time.
//!
//! All three domain values are one-second resolution: [`Date`] (calendar
//! day, local zone), [`TimeOfDay`] (wall clock within a day), and
//! [`Timestamp`] (UTC-anchored instant).

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use std::fmt;
use std::time::Duration;

/// Calendar date, year/month/day, local zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Date(NaiveDate);

impl Date {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Date)
    }

    /// Parse an ISO `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Date)
    }

    pub fn succ(self, days: i64) -> Self {
        Date(self.0 + chrono::Duration::days(days))
    }

    pub fn inner(self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Wall-clock time of day, one-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Build from seconds-since-midnight. Returns `None` outside `[0, 86400)`.
    pub fn from_seconds_in_day(secs: u32) -> Option<Self> {
        if secs >= 86_400 {
            return None;
        }
        NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).map(TimeOfDay)
    }

    /// Parse the time component out of an ISO `YYYY-MM-DDTHH:MM[:SS]` string.
    pub fn parse_from_iso_datetime(s: &str) -> Option<Self> {
        parse_naive_datetime(s).map(|dt| TimeOfDay(dt.time()))
    }

    pub fn seconds_in_day(self) -> u32 {
        self.0.num_seconds_from_midnight()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

/// UTC-anchored instant, one-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_epoch_seconds(secs: i64) -> Self {
        Timestamp(secs)
    }

    pub fn epoch_seconds(self) -> i64 {
        self.0
    }

    /// Parse an ISO `YYYY-MM-DDTHH:MM[:SS]` string, interpreted as local time
    /// and converted to its UTC-anchored instant — this matches how
    /// Open-Meteo-style APIs report `current.time`/`daily.time` in the
    /// location's own `timezone=auto` zone.
    pub fn parse_from_iso_local(s: &str) -> Option<Self> {
        let naive = parse_naive_datetime(s)?;
        let local = Local.from_local_datetime(&naive).single()?;
        Some(Timestamp(local.with_timezone(&Utc).timestamp()))
    }

    pub fn now() -> Self {
        Timestamp(Utc::now().timestamp())
    }

    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        let delta = self.0 - earlier.0;
        if delta <= 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(delta as u64)
        }
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.as_secs() as i64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Utc.timestamp_opt(self.0, 0).single() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "<invalid:{}>", self.0),
        }
    }
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .ok()
}

/// Source of "current time", injected everywhere the core needs to know
/// what day or instant it is. Production code uses [`SystemClock`]; tests
/// use [`FixedClock`] so property and scenario tests are deterministic.
pub trait Clock: Send + Sync {
    /// Current instant, floored to the second.
    fn now(&self) -> Timestamp;

    /// Today's date in the local zone.
    fn local_today(&self) -> Date;
}

/// Reads the OS clock, floored to seconds, local zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_epoch_seconds(Utc::now().timestamp())
    }

    fn local_today(&self) -> Date {
        Date(Local::now().date_naive())
    }
}

/// A clock pinned to a fixed instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: Timestamp,
    today: Date,
}

impl FixedClock {
    pub fn new(now: Timestamp, today: Date) -> Self {
        FixedClock { now, today }
    }

    pub fn from_epoch_seconds(secs: i64, today: Date) -> Self {
        FixedClock::new(Timestamp::from_epoch_seconds(secs), today)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn local_today(&self) -> Date {
        self.today
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_roundtrips_iso_string() {
        let d = Date::from_ymd(2026, 7, 28).unwrap();
        assert_eq!(d.to_string(), "2026-07-28");
        assert_eq!(Date::parse("2026-07-28"), Some(d));
    }

    #[test]
    fn time_of_day_seconds_boundary() {
        assert!(TimeOfDay::from_seconds_in_day(0).is_some());
        assert!(TimeOfDay::from_seconds_in_day(86_399).is_some());
        assert!(TimeOfDay::from_seconds_in_day(86_400).is_none());
    }

    #[test]
    fn time_of_day_from_iso_datetime_takes_time_component() {
        let t = TimeOfDay::parse_from_iso_datetime("2026-07-28T06:15").unwrap();
        assert_eq!(t.seconds_in_day(), 6 * 3600 + 15 * 60);
    }

    #[test]
    fn timestamp_duration_since_never_underflows() {
        let earlier = Timestamp::from_epoch_seconds(100);
        let later = Timestamp::from_epoch_seconds(50);
        assert_eq!(later.saturating_duration_since(earlier), Duration::ZERO);
        assert_eq!(
            earlier.saturating_duration_since(later),
            Duration::from_secs(50)
        );
    }

    #[test]
    fn fixed_clock_is_stable_across_calls() {
        let clock = FixedClock::from_epoch_seconds(1_700_000_000, Date::from_ymd(2023, 11, 14).unwrap());
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.local_today(), clock.local_today());
    }
}
