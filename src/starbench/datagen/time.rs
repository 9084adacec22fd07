//! Time dimension generator
//!
//! Enumerates every calendar day in the configured range; the cardinality
//! is exactly days-in-range, never sampled. Fiscal year starts in February.

use crate::starbench::model::TimeRow;
use chrono::{Datelike, NaiveDate, Weekday};

/// Fixed US-federal holiday set used for the holiday flag
const HOLIDAYS: [(u32, u32); 4] = [(1, 1), (7, 4), (11, 24), (12, 25)];

/// Generate one row per day in `[start, end]`
pub fn generate(start: NaiveDate, end: NaiveDate) -> Vec<TimeRow> {
    let mut rows = Vec::new();
    let mut date = start;
    while date <= end {
        rows.push(row_for(date));
        date = match date.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }
    rows
}

fn row_for(date: NaiveDate) -> TimeRow {
    let month = date.month();
    let quarter = quarter_of(month);
    let weekday = date.weekday();

    // Fiscal year starts in February
    let fiscal_year = if month >= 2 { date.year() } else { date.year() - 1 };
    let fiscal_month = ((month as i32 - 2).rem_euclid(12) + 1) as u32;
    let fiscal_quarter = format!("FY-Q{}", (fiscal_month - 1) / 3 + 1);
    let fiscal_period = format!("FY{}-P{:02}", fiscal_year, fiscal_month);

    TimeRow {
        time_key: time_key_of(date),
        date,
        year: date.year(),
        quarter,
        month,
        month_name: month_name(month).to_string(),
        week: date.iso_week().week(),
        day_of_month: date.day(),
        day_of_week: weekday.number_from_monday(),
        day_name: day_name(weekday).to_string(),
        is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
        is_holiday: HOLIDAYS.contains(&(month, date.day())),
        fiscal_year,
        fiscal_quarter,
        fiscal_period,
    }
}

/// yyyymmdd surrogate key
pub fn time_key_of(date: NaiveDate) -> i64 {
    date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day() as i64
}

pub fn quarter_of(month: u32) -> u8 {
    ((month - 1) / 3 + 1) as u8
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
