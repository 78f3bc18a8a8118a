//! Property tests over generated datasets
//!
//! Every case generates a report range (often starting and ending mid
//! period), a granularity, a user selection and a set of records scattered
//! around the range. The compiled report must be additive, tile its range
//! exactly, consume every in-range record once and compile the same way
//! twice.

use chrono::{Duration, NaiveDate};
use hourbook_core::{
    DateInterval, Granularity, GroupByKey, HourAccumulator, MemoryRecordSource, RecordEntry,
    RecordSource, Task, User, UserFilter, UserId,
};
use hourbook_report::{RangeInput, Report, ReportRequest};
use proptest::prelude::*;

const EPSILON: f64 = 1e-9;

const USERS: [&str; 3] = ["ann", "bob", "cat"];

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

fn tasks() -> Vec<Task> {
    vec![
        Task::new("t1").sort_key("1").group("Acme").duration(40.0),
        Task::new("t2").sort_key("2").group("Acme"),
        Task::new("t3").sort_key("3").group("Globex").duration(120.0),
        Task::new("t4").sort_key("4").group("Initech").duration(15.0),
    ]
}

/// One generated report: its request and the records it runs over
#[derive(Clone, Debug)]
struct Case {
    range: DateInterval,
    granularity: Granularity,
    users: Vec<User>,
    records: Vec<RecordEntry>,
}

impl Case {
    fn request(&self, granularity: Granularity) -> ReportRequest {
        ReportRequest::new(granularity)
            .range(RangeInput::new().dates(
                self.range.start.format("%Y-%m-%d").to_string(),
                self.range.end.format("%Y-%m-%d").to_string(),
            ))
            .tasks(tasks())
            .users(self.users.clone())
    }

    fn source(&self) -> MemoryRecordSource {
        MemoryRecordSource::new(self.records.clone())
    }

    fn compile(&self, source: &MemoryRecordSource) -> Report {
        self.compile_as(source, self.granularity)
    }

    fn compile_as(&self, source: &MemoryRecordSource, granularity: Granularity) -> Report {
        Report::compile_request(self.request(granularity), source, &GroupByKey).unwrap()
    }

    fn user_ids(&self) -> Vec<UserId> {
        self.users.iter().map(|u| u.id.clone()).collect()
    }
}

/// A record within a few months either side of any generated range.
/// Quarter hours keep every sum exact in binary floating point.
fn record_strategy() -> impl Strategy<Value = RecordEntry> {
    (
        0usize..4, // task
        0usize..USERS.len(), // user
        0i64..1300, // day offset
        1u32..=32, // quarter hours
        any::<bool>(), // committed
    )
        .prop_map(|(task, user, day, quarters, committed)| {
            let task = format!("t{}", task + 1);
            let date = base_date() + Duration::days(day);
            let hours = f64::from(quarters) * 0.25;
            if committed {
                RecordEntry::committed(&task, USERS[user], date, hours)
            } else {
                RecordEntry::not_committed(&task, USERS[user], date, hours)
            }
        })
}

/// A range, granularity, user selection and record set.
/// A zero user mask selects nobody, so the report covers all users.
fn case_strategy() -> impl Strategy<Value = Case> {
    (
        30i64..760, // range start offset
        0i64..540, // range length
        0usize..Granularity::ALL.len(), // granularity index
        0u8..8, // user mask
        prop::collection::vec(record_strategy(), 0..200),
    )
        .prop_map(|(start, length, granularity, user_mask, records)| {
            let start = base_date() + Duration::days(start);
            let users = USERS
                .iter()
                .enumerate()
                .filter(|(i, _)| user_mask & (1u8 << *i) != 0)
                .map(|(_, id)| User::new(*id))
                .collect();
            Case {
                range: DateInterval::new(start, start + Duration::days(length)),
                granularity: Granularity::ALL[granularity],
                users,
                records,
            }
        })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Column, row, section, user and grand totals all agree
    #[test]
    fn totals_are_additive(case in case_strategy()) {
        let report = case.compile(&case.source());
        let grand = report.totals.total();

        let columns: f64 = report.column_totals.iter().map(HourAccumulator::total).sum();
        let rows: f64 = report.rows.iter().map(|r| r.totals.total()).sum();
        let sections: f64 = report.sections.iter().map(|s| s.totals.total()).sum();
        prop_assert!(close(columns, grand), "columns {} != {}", columns, grand);
        prop_assert!(close(rows, grand), "rows {} != {}", rows, grand);
        prop_assert!(close(sections, grand), "sections {} != {}", sections, grand);

        if !case.users.is_empty() {
            let users: f64 = report.user_column_totals.iter().map(HourAccumulator::total).sum();
            prop_assert!(close(users, grand), "users {} != {}", users, grand);
        }

        prop_assert_eq!(report.rows.len(), report.tasks.len());
        for row in &report.rows {
            prop_assert_eq!(row.cells.len(), report.column_count());
            let cells: f64 = row.cells.iter().map(|c| c.total()).sum();
            prop_assert!(close(cells, row.totals.total()));
        }
        for section in &report.sections {
            prop_assert_eq!(section.cells.len(), report.column_count());
            for (column, hours) in section.cells.iter().enumerate() {
                let members: f64 = section.rows().map(|r| report.rows[r].cells[column].total()).sum();
                prop_assert!(close(members, hours.total()));
            }
        }
        for (column, total) in report.column_totals.iter().enumerate() {
            let cells: f64 = report.rows.iter().map(|r| r.cells[column].total()).sum();
            prop_assert!(close(cells, total.total()));
        }
    }

    /// Columns start and end on the range and leave no gaps
    #[test]
    fn columns_tile_the_range(case in case_strategy()) {
        let report = case.compile(&case.source());
        let cols = &report.column_ranges;

        prop_assert!(!cols.is_empty());
        prop_assert_eq!(cols[0].start, case.range.start);
        prop_assert_eq!(cols[cols.len() - 1].end, case.range.end);
        let days: i64 = cols.iter().map(DateInterval::days).sum();
        prop_assert_eq!(days, case.range.days());
        for pair in cols.windows(2) {
            prop_assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
        }
        if case.granularity == Granularity::TotalsOnly {
            prop_assert_eq!(cols.len(), 1);
        }
    }

    /// Every fetched record lands in exactly one cell
    #[test]
    fn sweep_conserves_hours(case in case_strategy()) {
        let source = case.source();
        let report = case.compile(&source);
        prop_assert_eq!(report.unswept_records, 0);

        let ids = case.user_ids();
        let filter = if ids.is_empty() { UserFilter::All } else { UserFilter::Only(&ids) };

        for (task, row) in report.tasks.iter().zip(&report.rows) {
            let committed: f64 = source
                .committed(task, filter, case.range)
                .unwrap()
                .iter()
                .map(|r| r.hours)
                .sum();
            let not_committed: f64 = source
                .not_committed(task, filter, case.range)
                .unwrap()
                .iter()
                .map(|r| r.hours)
                .sum();

            let cell_committed: f64 = row.cells.iter().map(|c| c.committed()).sum();
            let cell_not_committed: f64 = row.cells.iter().map(|c| c.not_committed()).sum();
            prop_assert!(close(cell_committed, committed), "{} != {}", cell_committed, committed);
            prop_assert!(close(cell_not_committed, not_committed));
        }
    }

    /// With a user selection, the per-user breakdown adds up to each cell
    #[test]
    fn user_breakdown_matches_cells(case in case_strategy()) {
        let report = case.compile(&case.source());

        for row in &report.rows {
            for cell in &row.cells {
                prop_assert_eq!(cell.user_data.len(), case.users.len());
                if case.users.is_empty() {
                    continue;
                }
                let users = cell.user_sum();
                prop_assert!(close(users.committed, cell.committed()));
                prop_assert!(close(users.not_committed, cell.not_committed()));
            }
            if !case.users.is_empty() {
                let users: HourAccumulator = row.user_totals.iter().sum();
                prop_assert!(close(users.total(), row.totals.total()));
            }
        }
    }

    /// Compiling twice, or recompiling the same report, gives identical figures
    #[test]
    fn compilation_is_repeatable(case in case_strategy()) {
        let source = case.source();
        let first = case.compile(&source);
        let second = case.compile(&source);

        prop_assert_eq!(&first.rows, &second.rows);
        prop_assert_eq!(&first.column_totals, &second.column_totals);
        prop_assert_eq!(&first.sections, &second.sections);
        prop_assert_eq!(first.totals, second.totals);

        let mut again = first.clone();
        again.compile(&source, &GroupByKey).unwrap();
        prop_assert_eq!(&again.rows, &first.rows);
        prop_assert_eq!(&again.column_ranges, &first.column_ranges);
        prop_assert_eq!(&again.user_column_totals, &first.user_column_totals);
        prop_assert_eq!(again.total_actual_remaining, first.total_actual_remaining);
    }

    /// Row totals and remaining hours do not depend on the granularity
    #[test]
    fn granularity_never_changes_row_totals(case in case_strategy()) {
        let source = case.source();
        let totals = case.compile_as(&source, Granularity::TotalsOnly);
        let report = case.compile(&source);

        for (coarse, fine) in totals.rows.iter().zip(&report.rows) {
            prop_assert!(close(coarse.totals.committed, fine.totals.committed));
            prop_assert!(close(coarse.totals.not_committed, fine.totals.not_committed));
        }
        prop_assert!(totals.total_actual_remaining.is_some());
        prop_assert!(close(
            totals.total_actual_remaining.unwrap(),
            report.total_actual_remaining.unwrap(),
        ));
        prop_assert!(close(
            totals.total_potential_remaining.unwrap(),
            report.total_potential_remaining.unwrap(),
        ));
    }
}
