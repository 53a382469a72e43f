use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::debug;
use crate::core::{PlaylistRecord, Schedule};
use crate::schedule::clock::{ClockTime, ScheduleError};

/// Window start used when a schedule leaves it out
pub const DEFAULT_START: ClockTime = ClockTime::from_hm(9, 0);

/// Window end used when a schedule leaves it out
pub const DEFAULT_END: ClockTime = ClockTime::from_hm(17, 0);

/// Records eligible to play at `now`, in snapshot order.
///
/// `now` is local wall-clock time. A record qualifies when it is active,
/// has at least one item, lists the current weekday (0 = Sunday) and the
/// current minute lies inside `[start, end]` inclusive. The first entry is
/// the one to play.
pub fn select_active(records: &[PlaylistRecord], now: NaiveDateTime) -> Vec<&PlaylistRecord> {
    let day = now.weekday().num_days_from_sunday() as u8;
    let minutes = now.hour() * 60 + now.minute();

    records
        .iter()
        .filter(|record| is_eligible(record, day, minutes))
        .collect()
}

fn is_eligible(record: &PlaylistRecord, day: u8, minutes: u32) -> bool {
    if !record.is_active || record.items.is_empty() {
        return false;
    }

    let Some(schedule) = &record.schedule else {
        return false;
    };

    if !schedule.days.contains(&day) {
        return false;
    }

    match window(schedule) {
        Ok((start, end)) => start.minutes() <= minutes && minutes <= end.minutes(),
        Err(e) => {
            debug!(playlist = %record.id, error = %e, "ignoring playlist with unreadable schedule");
            false
        }
    }
}

/// Start and end of a schedule window, with defaults for missing bounds
pub fn window(schedule: &Schedule) -> Result<(ClockTime, ClockTime), ScheduleError> {
    let start = bound(schedule.start.as_deref(), DEFAULT_START)?;
    let end = bound(schedule.end.as_deref(), DEFAULT_END)?;
    Ok((start, end))
}

fn bound(value: Option<&str>, default: ClockTime) -> Result<ClockTime, ScheduleError> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(s) => ClockTime::parse(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ItemKind, PlaylistItem};
    use chrono::NaiveDate;

    // 2024-01-01 was a Monday
    fn monday(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    fn tuesday(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn playlist(id: &str, schedule: Schedule) -> PlaylistRecord {
        PlaylistRecord::new(id, id)
            .with_items(vec![PlaylistItem::new("i1", "slide", ItemKind::Image)])
            .with_schedule(schedule)
    }

    fn ids(selected: Vec<&PlaylistRecord>) -> Vec<&str> {
        selected.into_iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let records = vec![playlist("a", Schedule::new("09:00", "17:00", &[1]))];

        assert_eq!(ids(select_active(&records, monday(9, 0, 0))), vec!["a"]);
        assert_eq!(ids(select_active(&records, monday(17, 0, 0))), vec!["a"]);
        assert_eq!(ids(select_active(&records, monday(17, 0, 59))), vec!["a"]);
        assert!(select_active(&records, monday(8, 59, 0)).is_empty());
        assert!(select_active(&records, monday(17, 1, 0)).is_empty());
        assert!(select_active(&records, tuesday(12, 0)).is_empty());
    }

    #[test]
    fn test_inactive_and_empty_never_selected() {
        let mut inactive = playlist("inactive", Schedule::daily("00:00", "23:59"));
        inactive.is_active = false;
        let empty = playlist("empty", Schedule::daily("00:00", "23:59")).with_items(Vec::new());
        let records = vec![inactive, empty];

        assert!(select_active(&records, monday(12, 0, 0)).is_empty());
    }

    #[test]
    fn test_snapshot_order_preserved() {
        let records = vec![
            playlist("b", Schedule::daily("08:00", "20:00")),
            playlist("off", Schedule::new("08:00", "20:00", &[0])),
            playlist("a", Schedule::daily("10:00", "12:00")),
        ];
        assert_eq!(ids(select_active(&records, monday(11, 0, 0))), vec!["b", "a"]);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let records = vec![
            playlist("a", Schedule::daily("08:00", "20:00")),
            playlist("b", Schedule::daily("10:00", "12:00")),
        ];
        let now = monday(10, 30, 0);
        assert_eq!(select_active(&records, now), select_active(&records, now));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_missing_bounds_use_defaults() {
        let schedule = Schedule { start: None, end: Some(String::new()), days: vec![1] };
        let records = vec![playlist("a", schedule)];

        assert_eq!(ids(select_active(&records, monday(9, 0, 0))), vec!["a"]);
        assert_eq!(ids(select_active(&records, monday(17, 0, 0))), vec!["a"]);
        assert!(select_active(&records, monday(17, 1, 0)).is_empty());
    }

    #[test]
    fn test_missing_schedule_or_days_never_matches() {
        let unscheduled = PlaylistRecord::new("u", "u")
            .with_items(vec![PlaylistItem::new("i", "i", ItemKind::Text)]);
        let no_days = playlist("n", Schedule { start: None, end: None, days: Vec::new() });
        let records = vec![unscheduled, no_days];

        assert!(select_active(&records, monday(12, 0, 0)).is_empty());
    }

    #[test]
    fn test_malformed_time_never_matches() {
        let records = vec![
            playlist("bad", Schedule::daily("noon", "17:00")),
            playlist("good", Schedule::daily("09:00", "17:00")),
        ];
        assert_eq!(ids(select_active(&records, monday(12, 0, 0))), vec!["good"]);
    }

    #[test]
    fn test_out_of_range_time_never_matches() {
        let records = vec![
            playlist("huge", Schedule::daily("99999999:00", "17:00")),
            playlist("late", Schedule::daily("00:00", "25:00")),
            playlist("minute", Schedule::daily("09:75", "17:00")),
            playlist("good", Schedule::daily("09:00", "17:00")),
        ];
        for hour in [0, 12, 23] {
            let expected: Vec<&str> = if hour == 12 { vec!["good"] } else { Vec::new() };
            assert_eq!(ids(select_active(&records, monday(hour, 0, 0))), expected);
        }
    }

    #[test]
    fn test_inverted_window_matches_nothing() {
        let records = vec![playlist("night", Schedule::daily("22:00", "06:00"))];
        assert!(select_active(&records, monday(23, 0, 0)).is_empty());
        assert!(select_active(&records, monday(3, 0, 0)).is_empty());
    }

    #[test]
    fn test_sunday_is_day_zero() {
        let sunday = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let records = vec![playlist("weekend", Schedule::new("09:00", "17:00", &[0, 6]))];
        assert_eq!(ids(select_active(&records, sunday)), vec!["weekend"]);
    }
}
