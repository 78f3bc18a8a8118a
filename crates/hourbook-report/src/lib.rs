//! # hourbook-report
//!
//! Compiles worked-hours reports: tasks as rows, time periods as columns,
//! committed and not-committed hours in every cell, rolled up into row,
//! column, section, per-user and grand totals.
//!
//! This crate provides:
//! - Range resolution with dataset-derived defaults (`range`)
//! - Column generation for every [`Granularity`] (`columns`)
//! - Single-pass bucketing of pre-sorted records into columns (`sweep`)
//! - The aggregation lattice of rows, sections and totals (`lattice`)
//! - The [`Report`] orchestrator tying them together (`report`)
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use hourbook_core::{Granularity, MemoryRecordSource, RecordEntry, SingleSection, Task};
//! use hourbook_report::{RangeInput, Report, ReportRequest};
//!
//! let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
//! let source = MemoryRecordSource::new(vec![
//!     RecordEntry::committed("design", "ann", day, 3.0),
//!     RecordEntry::not_committed("design", "ann", day, 1.5),
//! ]);
//!
//! let request = ReportRequest::new(Granularity::Month)
//!     .range(RangeInput::new().dates("2024-01-01", "2024-03-31"))
//!     .tasks(vec![Task::new("design").duration(10.0)]);
//!
//! let report = Report::compile_request(request, &source, &SingleSection).unwrap();
//! assert_eq!(report.column_count(), 3);
//! assert_eq!(report.totals.total(), 4.5);
//! assert_eq!(report.total_actual_remaining, Some(7.0));
//! ```

pub mod columns;
pub mod lattice;
pub mod range;
pub mod report;
pub mod sweep;

pub use columns::{columns, Columns};
pub use lattice::{Cell, RemainingHours, Row, Section};
pub use range::{RangeInput, RangeResolver, DEFAULT_FIRST_YEAR};
pub use report::{CompileStage, Report, ReportRequest};
pub use sweep::{RecordCursor, TaskRecords, UserIndex};

pub use hourbook_core::Granularity;
