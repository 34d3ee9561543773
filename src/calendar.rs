//! UTC calendar ranges used for chart and contribution bucketing.

use crate::models::DateRange;
use chrono::{Datelike, Duration, Months, NaiveDate};

/// Monday-to-Sunday ISO week containing `date`.
pub fn week_of(date: NaiveDate) -> DateRange {
    let start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    DateRange {
        start,
        end: start + Duration::days(6),
    }
}

pub fn month_of(date: NaiveDate) -> DateRange {
    let start = month_start(date);
    DateRange {
        start,
        end: last_day_before(start, 1),
    }
}

/// Calendar quarter (Jan-Mar, Apr-Jun, Jul-Sep, Oct-Dec) containing `date`.
pub fn quarter_of(date: NaiveDate) -> DateRange {
    let month = month_start(date);
    let start = month
        .checked_sub_months(Months::new(date.month0() % 3))
        .unwrap_or(month);
    DateRange {
        start,
        end: last_day_before(start, 3),
    }
}

pub fn week_label(range: &DateRange) -> String {
    let iso = range.start.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

pub fn month_label(range: &DateRange) -> String {
    range.start.format("%Y-%m").to_string()
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

fn last_day_before(start: NaiveDate, months: u32) -> NaiveDate {
    start
        .checked_add_months(Months::new(months))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}
