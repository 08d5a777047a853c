//! # Time Bucketing
//!
//! Pure functions turning "now" into the day/week/month boundaries the
//! aggregation layer counts against. Weeks start on Monday: the native
//! Sunday-is-0 weekday index is remapped so Monday is 0 and Sunday is 6.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open UTC time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format("%Y-%m-%dT%H:%M:%S"),
            self.end.format("%Y-%m-%dT%H:%M:%S")
        )
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

/// Weekday index with Monday as 0 and Sunday as 6.
pub fn weekday_monday0(date: NaiveDate) -> u32 {
    // chrono's num_days_from_sunday is the platform-native Sunday-is-0 index
    let sunday0 = date.weekday().num_days_from_sunday();
    if sunday0 == 0 {
        6
    } else {
        sunday0 - 1
    }
}

/// The full calendar day containing `date`.
pub fn day_window(date: NaiveDate) -> TimeWindow {
    TimeWindow::new(midnight(date), midnight(date) + Duration::days(1))
}

/// The current calendar day of `now`.
pub fn today_window(now: DateTime<Utc>) -> TimeWindow {
    day_window(now.date_naive())
}

/// From the first of the current month up to (excluding) today's midnight.
/// Empty on the first day of the month.
pub fn month_before_today(now: DateTime<Utc>) -> TimeWindow {
    let today = now.date_naive();
    let first = today.with_day(1).unwrap();
    TimeWindow::new(midnight(first), midnight(today))
}

/// Dates of the current week from Monday through today, inclusive.
pub fn week_dates(now: DateTime<Utc>) -> Vec<NaiveDate> {
    let today = now.date_naive();
    let offset = weekday_monday0(today) as i64;
    let monday = today - Duration::days(offset);
    (0..=offset).map(|d| monday + Duration::days(d)).collect()
}
