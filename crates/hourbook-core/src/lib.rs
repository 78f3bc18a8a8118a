//! # hourbook-core
//!
//! Core domain model and collaborator traits for the hourbook report engine.
//!
//! This crate provides:
//! - Domain types: `HourAccumulator`, `DateInterval`, `Task`, `User`, `TimeRecord`
//! - Collaborator traits: `RecordSource`, `SectionRule`
//! - The `Granularity` registry and its calendar period functions
//! - Error types shared by the engine
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use hourbook_core::{DateInterval, HourAccumulator};
//!
//! let mut hours = HourAccumulator::new();
//! hours.add_committed(3.0);
//! hours.add_not_committed(1.5);
//! assert_eq!(hours.total(), 4.5);
//!
//! let jan = DateInterval::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//! );
//! assert_eq!(jan.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
//! ```

pub mod calendar;
pub mod granularity;
pub mod memory;

pub use granularity::Granularity;
pub use memory::{Dataset, MemoryRecordSource, RecordEntry};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Unique identifier for a task
pub type TaskId = String;

/// Unique identifier for a user
pub type UserId = String;

/// Error raised by an external collaborator (record source, directory)
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// Hour Accumulator
// ============================================================================

/// Committed and not-committed worked hours.
///
/// Every aggregate in a report (cell, row, column total, section, grand
/// total, per-user breakdowns) is one of these. Both counters always move
/// together when another accumulator is added in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HourAccumulator {
    /// Hours on finalized records
    pub committed: f64,
    /// Hours on records not yet finalized
    pub not_committed: f64,
}

impl HourAccumulator {
    pub const fn new() -> Self {
        Self {
            committed: 0.0,
            not_committed: 0.0,
        }
    }

    pub const fn with_hours(committed: f64, not_committed: f64) -> Self {
        Self {
            committed,
            not_committed,
        }
    }

    /// Committed plus not-committed hours
    pub fn total(&self) -> f64 {
        self.committed + self.not_committed
    }

    /// True if more than zero hours in total have been recorded
    pub fn has_hours(&self) -> bool {
        self.total() > 0.0
    }

    /// Add another accumulator's hours to this one
    pub fn add(&mut self, other: &HourAccumulator) {
        self.committed += other.committed;
        self.not_committed += other.not_committed;
    }

    pub fn add_committed(&mut self, hours: f64) {
        self.committed += hours;
    }

    pub fn add_not_committed(&mut self, hours: f64) {
        self.not_committed += hours;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl std::ops::AddAssign<&HourAccumulator> for HourAccumulator {
    fn add_assign(&mut self, rhs: &HourAccumulator) {
        self.add(rhs);
    }
}

impl<'a> std::iter::Sum<&'a HourAccumulator> for HourAccumulator {
    fn sum<I: Iterator<Item = &'a HourAccumulator>>(iter: I) -> Self {
        iter.fold(Self::new(), |mut acc, item| {
            acc.add(item);
            acc
        })
    }
}

// ============================================================================
// Date Interval
// ============================================================================

/// Closed, inclusive range of calendar dates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    /// Create an interval, swapping the endpoints if they are reversed
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// Interval covering exactly one day
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days covered, counting both endpoints
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

// ============================================================================
// Tasks, Users, Records
// ============================================================================

/// A unit of work that hours are booked against.
///
/// Owned by the caller's task directory; the engine only reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// Human-readable name
    pub name: String,
    /// Key used to order rows for display
    #[serde(default)]
    pub sort_key: String,
    /// Planned (estimated) hours
    #[serde(default)]
    pub duration: f64,
    /// Grouping key, typically customer or project
    #[serde(default)]
    pub group: Option<String>,
}

impl Task {
    /// Create a new task with the given ID
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            sort_key: id.clone(),
            id,
            duration: 0.0,
            group: None,
        }
    }

    /// Set the task name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the display sort key
    pub fn sort_key(mut self, key: impl Into<String>) -> Self {
        self.sort_key = key.into();
        self
    }

    /// Set the planned duration in hours
    pub fn duration(mut self, hours: f64) -> Self {
        self.duration = hours;
        self
    }

    /// Set the grouping key
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// A person who books hours
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A single booking of worked hours (a "work packet")
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRecord {
    pub date: NaiveDate,
    pub hours: f64,
    pub user: UserId,
}

impl TimeRecord {
    pub fn new(date: NaiveDate, hours: f64, user: impl Into<String>) -> Self {
        Self {
            date,
            hours,
            user: user.into(),
        }
    }
}

/// Which users' records a fetch should return
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserFilter<'a> {
    /// Records by anybody
    All,
    /// Only records by the listed users
    Only(&'a [UserId]),
}

impl UserFilter<'_> {
    pub fn matches(&self, user: &str) -> bool {
        match self {
            UserFilter::All => true,
            UserFilter::Only(ids) => ids.iter().any(|id| id == user),
        }
    }
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Supplier of time records for the report engine.
///
/// Every list returned by `committed` and `not_committed` must be sorted by
/// date, latest first. The engine walks each list from its end.
pub trait RecordSource {
    /// Date of the earliest record booked against any of the tasks
    fn earliest_record(&self, tasks: &[TaskId]) -> Result<Option<NaiveDate>, SourceError>;

    /// Date of the latest record booked against any of the tasks
    fn latest_record(&self, tasks: &[TaskId]) -> Result<Option<NaiveDate>, SourceError>;

    /// Committed records for a task within a range, latest first
    fn committed(
        &self,
        task: &Task,
        users: UserFilter<'_>,
        range: DateInterval,
    ) -> Result<Vec<TimeRecord>, SourceError>;

    /// Not-committed records for a task within a range, latest first
    fn not_committed(
        &self,
        task: &Task,
        users: UserFilter<'_>,
        range: DateInterval,
    ) -> Result<Vec<TimeRecord>, SourceError>;
}

/// Decides where report sections begin.
///
/// Called once per row in display order with the previous row's task
/// (`None` for the first row).
pub trait SectionRule {
    fn is_new_section(&self, previous: Option<&Task>, current: &Task) -> bool;
}

impl<F> SectionRule for F
where
    F: Fn(Option<&Task>, &Task) -> bool,
{
    fn is_new_section(&self, previous: Option<&Task>, current: &Task) -> bool {
        self(previous, current)
    }
}

/// Puts every row into one section
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleSection;

impl SectionRule for SingleSection {
    fn is_new_section(&self, previous: Option<&Task>, _current: &Task) -> bool {
        previous.is_none()
    }
}

/// Starts a new section whenever the task group key changes
#[derive(Clone, Copy, Debug, Default)]
pub struct GroupByKey;

impl SectionRule for GroupByKey {
    fn is_new_section(&self, previous: Option<&Task>, current: &Task) -> bool {
        previous.map_or(true, |prev| prev.group != current.group)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Report compilation error
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Source(SourceError),

    #[error("Row {row} reached before any section was opened")]
    NoOpenSection { row: usize },

    #[error("Index mismatch: {what} has {found} entries, expected {expected}")]
    IndexMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Column {index} out of range (report has {count} columns)")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("Unknown granularity: {0}")]
    UnknownGranularity(String),
}

impl From<SourceError> for ReportError {
    fn from(err: SourceError) -> Self {
        ReportError::Source(err)
    }
}

// ============================================================================
// Tests
// ============================================================================
