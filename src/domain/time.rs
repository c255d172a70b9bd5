//! Time-grid helpers shared by the simulators and the ETL stages.
//!
//! Every series in the pipeline lives on a UTC grid aligned to midnight with
//! a fixed cadence ([`Interval`]). Day windows are half-open: `[00:00, next 00:00)`.

use chrono::{DateTime, Duration, DurationRound, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub const HOURS_IN_DAY: u32 = 24;
pub const MINUTES_IN_HOUR: u32 = 60;

/// Sampling cadence of a gridded series
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum Interval {
    #[serde(rename = "hourly")]
    #[strum(serialize = "hourly")]
    Hourly,
    #[serde(rename = "30m")]
    #[strum(serialize = "30m")]
    ThirtyMinutes,
    #[default]
    #[serde(rename = "15m")]
    #[strum(serialize = "15m")]
    FifteenMinutes,
}

impl Interval {
    /// Length of one slot in minutes
    pub fn minutes(self) -> u32 {
        match self {
            Interval::Hourly => 60,
            Interval::ThirtyMinutes => 30,
            Interval::FifteenMinutes => 15,
        }
    }

    /// Length of one slot in hours (0.25 for 15m)
    pub fn hours(self) -> f64 {
        self.minutes() as f64 / MINUTES_IN_HOUR as f64
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(self.minutes() as i64)
    }

    /// Number of slots in a calendar day (96 for 15m)
    pub fn per_day(self) -> usize {
        (HOURS_IN_DAY * MINUTES_IN_HOUR / self.minutes()) as usize
    }

    /// Number of slots an hourly reading fans out to
    pub fn per_hour(self) -> usize {
        (MINUTES_IN_HOUR / self.minutes()) as usize
    }
}

/// Midnight UTC at the start of `day`
pub fn midnight(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// Half-open `[start, end)` window covering every slot of `day`
pub fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = midnight(day);
    (start, start + Duration::days(1))
}

/// All grid timestamps of `day` at the given cadence
pub fn timestamps_for_day(day: NaiveDate, interval: Interval) -> Vec<DateTime<Utc>> {
    let start = midnight(day);
    let step = interval.duration();
    (0..interval.per_day())
        .map(|i| start + step * i as i32)
        .collect()
}

/// Truncate `ts` to the start of the slot containing it
pub fn floor_to_interval(ts: DateTime<Utc>, interval: Interval) -> DateTime<Utc> {
    ts.duration_trunc(interval.duration()).unwrap_or(ts)
}

pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    floor_to_interval(ts, Interval::Hourly)
}

/// Start of the slot that is currently in progress
pub fn current_interval_cutoff(now: DateTime<Utc>, interval: Interval) -> DateTime<Utc> {
    floor_to_interval(now, interval)
}

/// Grid for one pipeline run of `day`.
///
/// Past days get the full grid. Today's grid stops at the current interval
/// cutoff so no slot is extrapolated into the future, and future days are empty.
pub fn run_grid(day: NaiveDate, interval: Interval, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let today = now.date_naive();
    if day > today {
        return Vec::new();
    }
    let grid = timestamps_for_day(day, interval);
    if day < today {
        return grid;
    }
    let cutoff = current_interval_cutoff(now, interval);
    grid.into_iter().take_while(|ts| *ts <= cutoff).collect()
}

/// Every calendar day in `[start, end]`
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(Interval::Hourly, 60, 1.0, 24, 1)]
    #[case(Interval::ThirtyMinutes, 30, 0.5, 48, 2)]
    #[case(Interval::FifteenMinutes, 15, 0.25, 96, 4)]
    fn test_interval_helpers(
        #[case] interval: Interval,
        #[case] minutes: u32,
        #[case] hours: f64,
        #[case] per_day: usize,
        #[case] per_hour: usize,
    ) {
        assert_eq!(interval.minutes(), minutes);
        assert_eq!(interval.hours(), hours);
        assert_eq!(interval.per_day(), per_day);
        assert_eq!(interval.per_hour(), per_hour);
        assert_eq!(interval.duration(), Duration::minutes(minutes as i64));
    }

    #[test]
    fn test_interval_parses_config_names() {
        assert_eq!("15m".parse::<Interval>().unwrap(), Interval::FifteenMinutes);
        assert_eq!("hourly".parse::<Interval>().unwrap(), Interval::Hourly);
        assert_eq!(Interval::ThirtyMinutes.to_string(), "30m");
        assert!("5m".parse::<Interval>().is_err());
    }

    #[test]
    fn test_day_window_is_one_day() {
        let (start, end) = day_window(date(2026, 2, 25));
        assert_eq!(start.hour(), 0);
        assert_eq!(end - start, Duration::days(1));
        assert_eq!(end.date_naive(), date(2026, 2, 26));
    }

    #[test]
    fn test_timestamps_for_day() {
        let ts = timestamps_for_day(date(2026, 2, 25), Interval::FifteenMinutes);
        assert_eq!(ts.len(), 96);
        assert_eq!(ts[0], midnight(date(2026, 2, 25)));
        assert_eq!(ts[1] - ts[0], Duration::minutes(15));
        assert_eq!((ts[95].hour(), ts[95].minute()), (23, 45));
    }

    #[test]
    fn test_floor_to_interval() {
        let ts = midnight(date(2026, 2, 25)) + Duration::minutes(13 * 60 + 37) + Duration::seconds(12);
        let floored = floor_to_interval(ts, Interval::FifteenMinutes);
        assert_eq!((floored.hour(), floored.minute(), floored.second()), (13, 30, 0));
        let hour = floor_to_hour(ts);
        assert_eq!((hour.hour(), hour.minute()), (13, 0));
    }

    #[test]
    fn test_run_grid_truncates_today() {
        let day = date(2026, 2, 25);
        let now = midnight(day) + Duration::minutes(10 * 60 + 20);
        let grid = run_grid(day, Interval::FifteenMinutes, now);
        // 00:00 through 10:15 inclusive
        assert_eq!(grid.len(), 42);
        assert!(run_grid(date(2026, 2, 26), Interval::FifteenMinutes, now).is_empty());
        assert_eq!(run_grid(date(2026, 2, 24), Interval::FifteenMinutes, now).len(), 96);
    }

    #[test]
    fn test_days_inclusive() {
        let days: Vec<_> = days_inclusive(date(2026, 2, 27), date(2026, 3, 2)).collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[3], date(2026, 3, 2));
        assert_eq!(days_inclusive(date(2026, 3, 2), date(2026, 3, 1)).count(), 0);
    }
}
