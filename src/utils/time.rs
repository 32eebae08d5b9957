use chrono::{DateTime, Datelike, Duration, Local, NaiveTime, TimeZone, Utc};
use now::DateTimeNow;

/// Whole minutes between two instants, truncated. Activity durations are
/// stored in this unit.
pub fn duration_minutes(t0: DateTime<Utc>, t1: DateTime<Utc>) -> i64 {
    (t1 - t0).num_minutes()
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    (date + Duration::days(1)).with_time(NaiveTime::MIN).unwrap()
}

/// Midnight of the most recent Sunday. Weeks start on Sunday.
pub fn most_recent_sunday(now: DateTime<Local>) -> DateTime<Local> {
    now.beginning_of_day() - Duration::days(now.weekday().num_days_from_sunday() as i64)
}

/// Half-open window covering yesterday's calendar date.
pub fn yesterday_bounds(now: DateTime<Local>) -> (DateTime<Local>, DateTime<Local>) {
    let today = now.beginning_of_day();
    (today - Duration::days(1), today)
}
