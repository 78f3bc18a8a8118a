//! Calendar period functions
//!
//! Each `end_of_*` function maps a date to the last day of the period that
//! contains it. All of them are monotonic and idempotent: applying one to a
//! date that is already a period end returns the same date. Column
//! generation relies on this to make progress.
//!
//! Weeks are ISO weeks (Monday to Sunday). UK tax years run from 6 April to
//! 5 April of the following year.

use chrono::{Datelike, NaiveDate, Weekday};

/// First day of a UK tax year, as (month, day)
const UK_TAX_YEAR_START: (u32, u32) = (4, 6);

/// Last day of a UK tax year, as (month, day)
const UK_TAX_YEAR_END: (u32, u32) = (4, 5);

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MAX)
}

/// Last day of the month containing `date`
pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Last day of the calendar quarter containing `date`
pub fn end_of_quarter(date: NaiveDate) -> NaiveDate {
    let last_month = (date.month0() / 3) * 3 + 3;
    end_of_month(ymd(date.year(), last_month, 1))
}

/// 31 December of the year containing `date`
pub fn end_of_year(date: NaiveDate) -> NaiveDate {
    ymd(date.year(), 12, 31)
}

/// Sunday of the ISO week containing `date`
pub fn end_of_week(date: NaiveDate) -> NaiveDate {
    let days_left = 6 - i64::from(date.weekday().num_days_from_monday());
    date.checked_add_signed(chrono::Duration::days(days_left))
        .unwrap_or(NaiveDate::MAX)
}

/// 6 April starting the UK tax year that contains `date`
pub fn beginning_of_uk_tax_year(date: NaiveDate) -> NaiveDate {
    let (month, day) = UK_TAX_YEAR_START;
    let this_year = ymd(date.year(), month, day);
    if date >= this_year {
        this_year
    } else {
        ymd(date.year() - 1, month, day)
    }
}

/// 5 April ending the UK tax year that contains `date`
pub fn end_of_uk_tax_year(date: NaiveDate) -> NaiveDate {
    let (month, day) = UK_TAX_YEAR_END;
    let this_year = ymd(date.year(), month, day);
    if date <= this_year {
        this_year
    } else {
        ymd(date.year() + 1, month, day)
    }
}

/// Date of the given weekday within ISO week `week` of `year`
pub fn date_for_week(year: i32, week: u32, weekday: Weekday) -> Option<NaiveDate> {
    NaiveDate::from_isoywd_opt(year, week, weekday)
}

/// ISO week number of `date`
pub fn week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}
