//! End-to-end report scenarios
//!
//! Each test compiles a small report against an in-memory record source and
//! checks the figures a reader of the report would see.

use chrono::NaiveDate;
use hourbook_core::{
    DateInterval, Granularity, GroupByKey, HourAccumulator, MemoryRecordSource, RecordEntry,
    SingleSection, Task, User,
};
use hourbook_report::{RangeInput, Report, ReportRequest};
use pretty_assertions::assert_eq;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn interval(start: NaiveDate, end: NaiveDate) -> DateInterval {
    DateInterval::new(start, end)
}

// ============================================================================
// Totals only
// ============================================================================

#[test]
fn totals_only_single_column() {
    let source = MemoryRecordSource::new(vec![
        RecordEntry::committed("t1", "ann", date(2024, 1, 3), 3.0),
        RecordEntry::committed("t1", "ann", date(2024, 1, 28), 2.5),
    ]);
    let request = ReportRequest::new(Granularity::TotalsOnly)
        .range(RangeInput::new().dates("2024-01-01", "2024-01-31"))
        .tasks(vec![Task::new("t1")]);

    let report = Report::compile_request(request, &source, &SingleSection).unwrap();

    assert_eq!(report.column_count(), 1);
    assert_eq!(
        report.column_ranges[0],
        interval(date(2024, 1, 1), date(2024, 1, 31))
    );
    assert_eq!(report.rows[0].cells[0].committed(), 5.5);
    assert_eq!(report.rows[0].cells[0].not_committed(), 0.0);
    assert_eq!(report.column_heading(0).unwrap(), "01-Jan-2024 to 31-Jan-2024");
}

// ============================================================================
// Monthly with partial boundary columns
// ============================================================================

#[test]
fn monthly_partial_boundaries() {
    let source = MemoryRecordSource::new(vec![
        RecordEntry::committed("t1", "ann", date(2024, 1, 15), 1.0),
        RecordEntry::committed("t1", "ann", date(2024, 1, 31), 2.0),
        RecordEntry::not_committed("t1", "ann", date(2024, 2, 1), 4.0),
        RecordEntry::committed("t1", "ann", date(2024, 2, 10), 8.0),
    ]);
    let request = ReportRequest::new(Granularity::Month)
        .range(RangeInput::new().dates("2024-01-15", "2024-02-10"))
        .tasks(vec![Task::new("t1")]);

    let report = Report::compile_request(request, &source, &SingleSection).unwrap();

    assert_eq!(
        report.column_ranges,
        vec![
            interval(date(2024, 1, 15), date(2024, 1, 31)),
            interval(date(2024, 2, 1), date(2024, 2, 10)),
        ]
    );
    assert_eq!(
        report.column_totals,
        vec![
            HourAccumulator::with_hours(3.0, 0.0),
            HourAccumulator::with_hours(8.0, 4.0),
        ]
    );
}

/// Known limitation: both columns above are partial months, but
/// `partial_column` compares each clipped column with the overall range and
/// so reports neither as partial. This pins the current behaviour.
#[test]
fn partial_column_compares_against_clipped_range() {
    let source = MemoryRecordSource::default();
    let request = ReportRequest::new(Granularity::Month)
        .range(RangeInput::new().dates("2024-01-15", "2024-02-10"))
        .tasks(vec![Task::new("t1")]);

    let report = Report::compile_request(request, &source, &SingleSection).unwrap();

    assert_eq!(report.column_count(), 2);
    assert!(!report.partial_column(0).unwrap());
    assert!(!report.partial_column(1).unwrap());
    assert!(report.partial_column(2).is_err());
}

// ============================================================================
// Sections
// ============================================================================

#[test]
fn section_grouping() {
    let source = MemoryRecordSource::new(vec![
        RecordEntry::committed("t1", "ann", date(2024, 1, 5), 1.0),
        RecordEntry::committed("t1", "ann", date(2024, 2, 5), 2.0),
        RecordEntry::committed("t2", "ann", date(2024, 1, 6), 4.0),
        RecordEntry::not_committed("t2", "ann", date(2024, 2, 6), 8.0),
        RecordEntry::committed("t3", "ann", date(2024, 1, 7), 16.0),
        RecordEntry::committed("t3", "ann", date(2024, 2, 7), 32.0),
    ]);
    let tasks = vec![
        Task::new("t1").sort_key("1").group("Acme"),
        Task::new("t2").sort_key("2").group("Globex"),
        Task::new("t3").sort_key("3").group("Globex"),
    ];
    let request = ReportRequest::new(Granularity::Month)
        .range(RangeInput::new().dates("2024-01-01", "2024-02-29"))
        .tasks(tasks);

    let report = Report::compile_request(request, &source, &GroupByKey).unwrap();

    assert_eq!(report.sections.len(), 2);
    assert_eq!(report.sections[0].rows(), 0..1);
    assert_eq!(report.sections[1].rows(), 1..3);

    // Section cells equal the sum of their member rows' cells, per column
    for section in &report.sections {
        for column in 0..report.column_count() {
            let expected: HourAccumulator = section
                .rows()
                .map(|row| &report.rows[row].cells[column].hours)
                .sum();
            assert_eq!(section.cells[column], expected);
        }
    }

    assert_eq!(
        report.sections[1].cells,
        vec![
            HourAccumulator::with_hours(20.0, 0.0),
            HourAccumulator::with_hours(32.0, 8.0),
        ]
    );
    assert_eq!(report.sections[0].totals.total(), 3.0);
    assert_eq!(report.section_of_row(2), Some(1));
}

#[test]
fn closure_section_rule() {
    let source = MemoryRecordSource::default();
    let request = ReportRequest::new(Granularity::TotalsOnly)
        .range(RangeInput::new().dates("2024-01-01", "2024-01-31"))
        .tasks(vec![
            Task::new("a").sort_key("1"),
            Task::new("b").sort_key("2"),
            Task::new("c").sort_key("3"),
        ]);
    let every_row = |_: Option<&Task>, _: &Task| true;

    let report = Report::compile_request(request, &source, &every_row).unwrap();
    assert_eq!(report.sections.len(), 3);
}

// ============================================================================
// Remaining hours
// ============================================================================

#[test]
fn remaining_hours() {
    let source = MemoryRecordSource::new(vec![
        RecordEntry::committed("t1", "ann", date(2024, 1, 3), 4.0),
        RecordEntry::not_committed("t1", "ann", date(2024, 1, 4), 1.0),
    ]);
    let request = ReportRequest::new(Granularity::TotalsOnly)
        .range(RangeInput::new().dates("2024-01-01", "2024-01-31"))
        .tasks(vec![Task::new("t1").duration(10.0)]);

    let report = Report::compile_request(request, &source, &SingleSection).unwrap();

    assert_eq!(report.total_duration, 10.0);
    assert_eq!(report.total_actual_remaining, Some(6.0));
    assert_eq!(report.total_potential_remaining, Some(5.0));
}

#[test]
fn remaining_hours_ignore_unplanned_tasks() {
    let source = MemoryRecordSource::new(vec![
        RecordEntry::committed("planned", "ann", date(2024, 1, 3), 2.0),
        RecordEntry::committed("adhoc", "ann", date(2024, 1, 3), 50.0),
    ]);
    let request = ReportRequest::new(Granularity::TotalsOnly)
        .range(RangeInput::new().dates("2024-01-01", "2024-01-31"))
        .tasks(vec![
            Task::new("adhoc").sort_key("1"),
            Task::new("planned").sort_key("2").duration(5.0),
        ]);

    let report = Report::compile_request(request, &source, &SingleSection).unwrap();

    assert_eq!(report.total_actual_remaining, Some(3.0));
    assert_eq!(report.totals.total(), 52.0);
}

#[test]
fn remaining_hours_undefined_without_planned_tasks() {
    let source = MemoryRecordSource::new(vec![RecordEntry::committed(
        "t1",
        "ann",
        date(2024, 1, 3),
        2.0,
    )]);
    let request = ReportRequest::new(Granularity::TotalsOnly)
        .range(RangeInput::new().dates("2024-01-01", "2024-01-31"))
        .tasks(vec![Task::new("t1")]);

    let report = Report::compile_request(request, &source, &SingleSection).unwrap();

    assert_eq!(report.total_duration, 0.0);
    assert_eq!(report.total_actual_remaining, None);
    assert_eq!(report.total_potential_remaining, None);
}

// ============================================================================
// Range defaults and user filtering
// ============================================================================

#[test]
fn range_defaults_to_dataset_bounds() {
    let source = MemoryRecordSource::new(vec![
        RecordEntry::committed("t1", "ann", date(2023, 12, 30), 1.0),
        RecordEntry::not_committed("t1", "ann", date(2024, 3, 2), 1.0),
        RecordEntry::committed("other", "ann", date(2020, 1, 1), 1.0),
    ]);
    let request = ReportRequest::new(Granularity::Quarter).tasks(vec![Task::new("t1")]);

    let report = Report::compile_request(request, &source, &SingleSection).unwrap();

    assert_eq!(
        report.range,
        Some(interval(date(2023, 12, 30), date(2024, 3, 2)))
    );
    assert_eq!(report.column_count(), 2);
    assert_eq!(report.totals.total(), 2.0);
}

#[test]
fn user_selection_filters_records_and_breaks_them_down() {
    let source = MemoryRecordSource::new(vec![
        RecordEntry::committed("t1", "ann", date(2024, 1, 3), 1.0),
        RecordEntry::committed("t1", "bob", date(2024, 1, 4), 2.0),
        RecordEntry::not_committed("t1", "cat", date(2024, 1, 5), 4.0),
    ]);
    let request = ReportRequest::new(Granularity::TotalsOnly)
        .range(RangeInput::new().dates("2024-01-01", "2024-01-31"))
        .tasks(vec![Task::new("t1")])
        .users(vec![User::new("bob").name("Bob"), User::new("ann").name("Ann")]);

    let report = Report::compile_request(request, &source, &SingleSection).unwrap();

    // cat is not selected, so her hours are not fetched at all
    assert_eq!(report.totals.total(), 3.0);
    assert_eq!(report.users[0].id, "ann");
    assert_eq!(
        report.rows[0].user_totals,
        vec![
            HourAccumulator::with_hours(1.0, 0.0),
            HourAccumulator::with_hours(2.0, 0.0),
        ]
    );
    assert_eq!(report.sections[0].user_totals, report.user_column_totals);
}
