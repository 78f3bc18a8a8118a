//! Report granularity registry
//!
//! A granularity decides how the overall report range is split into
//! columns. The registry order is stable and user interfaces may refer to
//! entries by index (see [`Granularity::from_index`]).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::{DateInterval, ReportError};

/// Column partitioning scheme for a report
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// One column spanning the whole range
    #[default]
    #[serde(alias = "totals")]
    TotalsOnly,
    /// UK tax years (6 April to 5 April)
    #[serde(alias = "tax-year")]
    UkTaxYear,
    #[serde(alias = "year")]
    CalendarYear,
    Quarter,
    Month,
    /// ISO weeks, Monday to Sunday
    Week,
}

impl Granularity {
    /// All granularities in registry order
    pub const ALL: [Granularity; 6] = [
        Granularity::TotalsOnly,
        Granularity::UkTaxYear,
        Granularity::CalendarYear,
        Granularity::Quarter,
        Granularity::Month,
        Granularity::Week,
    ];

    /// Look up a granularity by registry index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Registry index of this granularity
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|g| g == self).unwrap_or(0)
    }

    /// Labels for every granularity, indexed as in [`Granularity::ALL`]
    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(Granularity::label).collect()
    }

    /// Human-readable name, suitable for a selection list
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::TotalsOnly => "Totals only",
            Granularity::UkTaxYear => "UK tax year",
            Granularity::CalendarYear => "Calendar year",
            Granularity::Quarter => "Calendar quarter",
            Granularity::Month => "Monthly",
            Granularity::Week => "Weekly",
        }
    }

    /// Title shown once alongside the per-column headings
    pub fn column_title(&self) -> &'static str {
        match self {
            Granularity::TotalsOnly => "",
            Granularity::UkTaxYear => "UK tax year:",
            Granularity::CalendarYear => "Year:",
            Granularity::Quarter => "Quarter starting:",
            Granularity::Month => "Month:",
            Granularity::Week => "Week starting:",
        }
    }

    /// Short name used in configuration files and on the command line
    pub fn short_name(&self) -> &'static str {
        match self {
            Granularity::TotalsOnly => "totals",
            Granularity::UkTaxYear => "tax-year",
            Granularity::CalendarYear => "year",
            Granularity::Quarter => "quarter",
            Granularity::Month => "month",
            Granularity::Week => "week",
        }
    }

    /// Kebab-case name used when serialized
    pub fn serde_name(&self) -> &'static str {
        match self {
            Granularity::TotalsOnly => "totals-only",
            Granularity::UkTaxYear => "uk-tax-year",
            Granularity::CalendarYear => "calendar-year",
            Granularity::Quarter => "quarter",
            Granularity::Month => "month",
            Granularity::Week => "week",
        }
    }

    /// Function mapping a date to the end of its period, if periodic
    pub fn period_end(&self) -> Option<fn(NaiveDate) -> NaiveDate> {
        match self {
            Granularity::TotalsOnly => None,
            Granularity::UkTaxYear => Some(calendar::end_of_uk_tax_year),
            Granularity::CalendarYear => Some(calendar::end_of_year),
            Granularity::Quarter => Some(calendar::end_of_quarter),
            Granularity::Month => Some(calendar::end_of_month),
            Granularity::Week => Some(calendar::end_of_week),
        }
    }

    pub fn is_periodic(&self) -> bool {
        self.period_end().is_some()
    }

    /// Heading for a column covering `range`
    pub fn heading(&self, range: &DateInterval) -> String {
        match self {
            Granularity::TotalsOnly => heading_total(range),
            Granularity::UkTaxYear => {
                let year = calendar::beginning_of_uk_tax_year(range.start).format("%Y");
                let next = calendar::end_of_uk_tax_year(range.start).format("%Y");
                format!("{year} / {next}")
            }
            Granularity::CalendarYear => range.start.format("%Y").to_string(),
            Granularity::Quarter | Granularity::Month => range.start.format("%b %Y").to_string(),
            Granularity::Week => format!(
                "{} ({})",
                range.start.format("%d-%b-%Y"),
                calendar::week_number(range.start)
            ),
        }
    }
}

/// "DD-Mon-YYYY to DD-Mon-YYYY"
pub fn heading_total(range: &DateInterval) -> String {
    format!(
        "{} to {}",
        range.start.format("%d-%b-%Y"),
        range.end.format("%d-%b-%Y")
    )
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Granularity {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if let Ok(index) = wanted.parse::<usize>() {
            return Self::from_index(index).ok_or_else(|| ReportError::UnknownGranularity(s.into()));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|g| {
                g.short_name() == wanted
                    || g.serde_name() == wanted
                    || g.label().to_ascii_lowercase() == wanted
            })
            .ok_or_else(|| ReportError::UnknownGranularity(s.into()))
    }
}
