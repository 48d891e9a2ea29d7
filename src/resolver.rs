//! Decomposition of a date range into the partition keys that cover it.

use crate::bucket::{day_key, month_key, week_key, year_key};
use crate::period::Period;
use chrono::{Datelike, NaiveDate};

/// Ordered keys covering `start..=end` at the given granularity.
///
/// An inverted range (`start > end`) resolves to no keys. WEEK steps seven
/// calendar days from `start`, so it is not aligned to week boundaries: a
/// range that starts late in one week and ends early in a later one can miss
/// the final partial week.
pub fn resolve(period: Period, start: NaiveDate, end: NaiveDate) -> Vec<String> {
    if start > end {
        return Vec::new();
    }

    match period {
        Period::Day => start
            .iter_days()
            .take_while(|date| *date <= end)
            .map(day_key)
            .collect(),
        Period::Week => start
            .iter_weeks()
            .take_while(|date| *date <= end)
            .map(week_key)
            .collect(),
        Period::Month => months_between(start, end),
        Period::Year => (start.year()..=end.year()).map(year_key).collect(),
    }
}

fn months_between(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let mut keys = Vec::new();
    for year in start.year()..=end.year() {
        let first = if year == start.year() { start.month() } else { 1 };
        let last = if year == end.year() { end.month() } else { 12 };
        keys.extend((first..=last).map(|month| month_key(year, month)));
    }
    keys
}
