//! Storage key formats for raw readings and rolled-up aggregates.
//!
//! Months and days are never zero-padded. Raw day partitions use `#` as the
//! separator (`2024#3#5`), range keys for week/month/year use `-`
//! (`2024-10`), and aggregate partitions live under an `AGG#<KIND>#` prefix.

use crate::period::RollupPeriod;
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Week number within the date's year, counting Sunday-started weeks.
///
/// `ceil((day_of_year0 + weekday_of_jan1 + 1) / 7)` with Sunday = 0, so Jan 1
/// is always in week 1 and the last days of a year can land in week 53 or 54.
pub fn week_of_year(date: NaiveDate) -> u32 {
    let day_of_year = date.ordinal0();
    let jan1_weekday = (date.weekday().num_days_from_sunday() + 7 - day_of_year % 7) % 7;
    (day_of_year + jan1_weekday + 1).div_ceil(7)
}

pub fn day_key(date: NaiveDate) -> String {
    format!("{}#{}#{}", date.year(), date.month(), date.day())
}

pub fn week_key(date: NaiveDate) -> String {
    format!("{}-{}", date.year(), week_of_year(date))
}

pub fn month_key(year: i32, month: u32) -> String {
    format!("{year}-{month}")
}

pub fn year_key(year: i32) -> String {
    year.to_string()
}

/// Partition for a raw reading written at `instant`
pub fn day_bucket_key(instant: DateTime<Utc>) -> String {
    day_key(instant.date_naive())
}

pub fn week_bucket_key(instant: DateTime<Utc>) -> String {
    let date = instant.date_naive();
    format!("AGG#WEEK#{}#{}", date.year(), week_of_year(date))
}

pub fn month_bucket_key(instant: DateTime<Utc>) -> String {
    format!("AGG#MONTH#{}#{}", instant.year(), instant.month())
}

pub fn year_bucket_key(instant: DateTime<Utc>) -> String {
    format!("AGG#YEAR#{}", instant.year())
}

/// Partition an aggregate for `period` is written under when the job runs at `instant`
pub fn aggregate_bucket_key(period: RollupPeriod, instant: DateTime<Utc>) -> String {
    match period {
        RollupPeriod::Week => week_bucket_key(instant),
        RollupPeriod::Month => month_bucket_key(instant),
        RollupPeriod::Year => year_bucket_key(instant),
    }
}
