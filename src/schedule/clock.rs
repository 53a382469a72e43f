use chrono::{Local, NaiveDateTime};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors raised while reading schedule data
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("invalid clock time {0:?}, expected HH:MM")]
    InvalidClockTime(String),
}

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Time of day as minutes since midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    minutes: u32,
}

impl ClockTime {
    pub const fn from_hm(hour: u32, minute: u32) -> Self {
        Self { minutes: hour * 60 + minute }
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Parse "HH:MM". Trailing fields such as seconds are ignored.
    /// "24:00" is accepted and closes a window at midnight; anything past
    /// it, or a minute above 59, is rejected.
    pub fn parse(s: &str) -> Result<Self, ScheduleError> {
        let mut parts = s.split(':');
        let mut field = || {
            parts
                .next()
                .map(str::trim)
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(|| ScheduleError::InvalidClockTime(s.to_string()))
        };
        let hour = field()?;
        let minute = field()?;

        let minutes = hour
            .checked_mul(60)
            .and_then(|m| m.checked_add(minute))
            .filter(|&m| minute < 60 && m <= MINUTES_PER_DAY)
            .ok_or_else(|| ScheduleError::InvalidClockTime(s.to_string()))?;
        Ok(Self { minutes })
    }
}

/// Source of the viewer's local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system clock in the local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to a settable instant
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Arc::new(Mutex::new(now)) }
    }

    /// Move the clock; clones observe the change
    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(ClockTime::parse("09:00").unwrap().minutes(), 540);
        assert_eq!(ClockTime::parse("9:5").unwrap().minutes(), 545);
        assert_eq!(ClockTime::parse(" 17 : 30 ").unwrap().minutes(), 1050);
        assert_eq!(ClockTime::parse("23:59:59").unwrap().minutes(), 1439);
    }

    #[test]
    fn test_parse_clock_time_rejects_garbage() {
        assert!(ClockTime::parse("").is_err());
        assert!(ClockTime::parse("9").is_err());
        assert!(ClockTime::parse("nine:00").is_err());
        assert_eq!(
            ClockTime::parse("-1:00"),
            Err(ScheduleError::InvalidClockTime("-1:00".to_string()))
        );
    }

    #[test]
    fn test_parse_clock_time_range() {
        assert_eq!(ClockTime::parse("24:00").unwrap().minutes(), MINUTES_PER_DAY);
        assert!(ClockTime::parse("24:01").is_err());
        assert!(ClockTime::parse("12:60").is_err());
        assert!(ClockTime::parse("99999999:00").is_err());
        assert!(ClockTime::parse("4294967295:4294967295").is_err());
    }

    #[test]
    fn test_fixed_clock_shared_between_clones() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        let observer = clock.clone();
        let later = start + chrono::Duration::hours(3);
        clock.set(later);
        assert_eq!(observer.now(), later);
    }
}
