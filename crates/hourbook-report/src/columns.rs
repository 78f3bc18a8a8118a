//! Column generation
//!
//! Splits the report range into column ranges according to a
//! [`Granularity`]. The emitted ranges are ascending, contiguous and
//! non-overlapping, and together cover the report range exactly once. The
//! first and last columns are clipped to the report range rather than
//! extended to whole periods.

use chrono::NaiveDate;

use hourbook_core::{DateInterval, Granularity};

/// Iterator over the column ranges of a report
#[derive(Clone, Debug)]
pub struct Columns {
    next_start: Option<NaiveDate>,
    end: NaiveDate,
    period_end: Option<fn(NaiveDate) -> NaiveDate>,
}

impl Iterator for Columns {
    type Item = DateInterval;

    fn next(&mut self) -> Option<DateInterval> {
        let start = self.next_start?;

        let column_end = match self.period_end {
            // Never step backwards, whatever the period function returns
            Some(period_end) => period_end(start).max(start).min(self.end),
            None => self.end,
        };

        self.next_start = column_end.succ_opt().filter(|next| *next <= self.end);
        Some(DateInterval {
            start,
            end: column_end,
        })
    }
}

/// Columns covering `range` at the given granularity
pub fn columns(range: DateInterval, granularity: Granularity) -> Columns {
    Columns {
        next_start: Some(range.start),
        end: range.end,
        period_end: granularity.period_end(),
    }
}

/// Columns covering `range`, one per period of `period_end`
pub fn periodic_columns(range: DateInterval, period_end: fn(NaiveDate) -> NaiveDate) -> Columns {
    Columns {
        next_start: Some(range.start),
        end: range.end,
        period_end: Some(period_end),
    }
}
