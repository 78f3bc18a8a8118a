//! Report range resolution
//!
//! Turns the raw range fields of a report request into one inclusive date
//! interval. Each endpoint is resolved independently:
//!
//! 1. month selector (`"YYYY_MM"`)
//! 2. week selector (`"YYYY_WW"`, ISO week)
//! 3. explicit date
//! 4. dataset default
//!
//! Only the highest-priority input that is present is consulted. If it
//! fails to parse, the endpoint takes the dataset default; a bad range is
//! never reported as an error.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use hourbook_core::calendar::{date_for_week, end_of_month};
use hourbook_core::{DateInterval, RecordSource, ReportError, TaskId};

/// First year assumed to hold data when a selection has no records
pub const DEFAULT_FIRST_YEAR: i32 = 2008;

/// Formats accepted for explicit dates
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%b-%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Raw range fields, as submitted by a user interface
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeInput {
    pub start: Option<String>,
    pub end: Option<String>,
    pub week_start: Option<String>,
    pub week_end: Option<String>,
    pub month_start: Option<String>,
    pub month_end: Option<String>,
}

impl RangeInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set explicit start and end dates
    pub fn dates(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self.end = Some(end.into());
        self
    }

    /// Set week selectors, e.g. `"2024_03"`
    pub fn weeks(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.week_start = Some(start.into());
        self.week_end = Some(end.into());
        self
    }

    /// Set month selectors, e.g. `"2024_01"`
    pub fn months(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.month_start = Some(start.into());
        self.month_end = Some(end.into());
        self
    }

    /// Start date requested by the input, if any parses
    pub fn parsed_start(&self) -> Option<NaiveDate> {
        if let Some(month) = present(&self.month_start) {
            return unpack(month).and_then(|(year, month)| NaiveDate::from_ymd_opt(year, month, 1));
        }
        if let Some(week) = present(&self.week_start) {
            return unpack(week).and_then(|(year, week)| date_for_week(year, week, Weekday::Mon));
        }
        present(&self.start).and_then(parse_date)
    }

    /// End date requested by the input, if any parses
    pub fn parsed_end(&self) -> Option<NaiveDate> {
        if let Some(month) = present(&self.month_end) {
            return unpack(month)
                .and_then(|(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
                .map(end_of_month);
        }
        if let Some(week) = present(&self.week_end) {
            return unpack(week).and_then(|(year, week)| date_for_week(year, week, Weekday::Sun));
        }
        present(&self.end).and_then(parse_date)
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Split `"2024_03"` into `(2024, 3)`; trailing parts are ignored
fn unpack(value: &str) -> Option<(i32, u32)> {
    let mut parts = value.split('_');
    let year = parts.next()?.trim().parse().ok()?;
    let number = parts.next()?.trim().parse().ok()?;
    Some((year, number))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Resolves [`RangeInput`] against a record source
pub struct RangeResolver<'a, S: RecordSource + ?Sized> {
    source: &'a S,
    today: NaiveDate,
    first_year: i32,
}

impl<'a, S: RecordSource + ?Sized> RangeResolver<'a, S> {
    pub fn new(source: &'a S, today: NaiveDate) -> Self {
        Self {
            source,
            today,
            first_year: DEFAULT_FIRST_YEAR,
        }
    }

    /// Set the first year assumed when the selection has no records
    pub fn first_year(mut self, year: i32) -> Self {
        self.first_year = year;
        self
    }

    /// Resolve the input into a normalized interval for the given tasks
    pub fn resolve(&self, input: &RangeInput, tasks: &[TaskId]) -> Result<DateInterval, ReportError> {
        let mut fallback = None;

        let start = match input.parsed_start() {
            Some(date) => date,
            None => self.default_range(tasks, &mut fallback)?.start,
        };
        let end = match input.parsed_end() {
            Some(date) => date,
            None => self.default_range(tasks, &mut fallback)?.end,
        };

        let range = DateInterval::new(start, end);
        debug!(%range, defaulted = fallback.is_some(), "resolved report range");
        Ok(range)
    }

    /// Range spanning the selection's records, computed at most once
    fn default_range(
        &self,
        tasks: &[TaskId],
        cache: &mut Option<DateInterval>,
    ) -> Result<DateInterval, ReportError> {
        if let Some(range) = cache {
            return Ok(*range);
        }

        let earliest = self.source.earliest_record(tasks)?;
        let latest = self.source.latest_record(tasks)?;

        let range = match (earliest, latest) {
            (Some(first), Some(last)) => DateInterval::new(first, last),
            _ => {
                let start = NaiveDate::from_ymd_opt(self.first_year, 1, 1).unwrap_or(self.today);
                DateInterval::new(start, self.today)
            }
        };

        *cache = Some(range);
        Ok(range)
    }
}
