//! Report orchestration
//!
//! A [`Report`] is created from a [`ReportRequest`] and then compiled
//! against a record source and a section rule. Compilation runs through a
//! fixed sequence of stages:
//!
//! ```text
//! Empty → RangeResolved → RowsBuilt → ColumnsBuilt → Totaled → Sectioned
//! ```
//!
//! An empty task selection skips straight from `RangeResolved` to
//! `Sectioned`, leaving every aggregate at its zero or `None` default.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use hourbook_core::granularity::heading_total;
use hourbook_core::{
    DateInterval, Granularity, HourAccumulator, RecordSource, ReportError, SectionRule, Task,
    TaskId, User, UserFilter, UserId,
};

use crate::columns::columns;
use crate::lattice::{user_column_totals, RemainingHours, Row, Section};
use crate::range::{RangeInput, RangeResolver, DEFAULT_FIRST_YEAR};
use crate::sweep::{TaskCursors, TaskRecords, UserIndex};

// ============================================================================
// Request
// ============================================================================

/// Everything needed to compile a report, apart from its collaborators
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Raw range fields
    #[serde(default)]
    pub range: RangeInput,
    #[serde(default)]
    pub granularity: Granularity,
    /// Selected tasks, already filtered for visibility
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Users to break hours down by; empty for no breakdown
    #[serde(default)]
    pub users: Vec<User>,
    /// First year assumed to hold data when the selection has none
    #[serde(default = "default_first_year")]
    pub first_year: i32,
    /// Date treated as today; the local date if unset
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

fn default_first_year() -> i32 {
    DEFAULT_FIRST_YEAR
}

impl Default for ReportRequest {
    fn default() -> Self {
        Self {
            range: RangeInput::default(),
            granularity: Granularity::default(),
            tasks: Vec::new(),
            users: Vec::new(),
            first_year: DEFAULT_FIRST_YEAR,
            today: None,
        }
    }
}

impl ReportRequest {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            ..Self::default()
        }
    }

    pub fn range(mut self, range: RangeInput) -> Self {
        self.range = range;
        self
    }

    /// Set the task selection, ordered by sort key
    pub fn tasks(mut self, mut tasks: Vec<Task>) -> Self {
        tasks.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        self.tasks = tasks;
        self
    }

    /// Set the user selection, ordered by name
    pub fn users(mut self, mut users: Vec<User>) -> Self {
        users.sort_by(|a, b| a.name.cmp(&b.name));
        self.users = users;
        self
    }

    pub fn first_year(mut self, year: i32) -> Self {
        self.first_year = year;
        self
    }

    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

// ============================================================================
// Report
// ============================================================================

/// Progress of a report through compilation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum CompileStage {
    #[default]
    Empty,
    RangeResolved,
    RowsBuilt,
    ColumnsBuilt,
    Totaled,
    Sectioned,
}

/// A compiled (or compilable) worked-hours report.
///
/// `rows` is index-aligned with `tasks`; each row's cells are index-aligned
/// with `column_ranges` and `column_totals`; every per-user list is
/// index-aligned with `users`.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub stage: CompileStage,
    /// Raw range fields the report was requested with
    pub range_input: RangeInput,
    /// Resolved report range, once compiled
    pub range: Option<DateInterval>,
    pub granularity: Granularity,
    pub first_year: i32,
    pub today: Option<NaiveDate>,
    pub tasks: Vec<Task>,
    pub users: Vec<User>,
    pub rows: Vec<Row>,
    pub column_ranges: Vec<DateInterval>,
    pub column_totals: Vec<HourAccumulator>,
    /// Per-user hours across all rows and columns
    pub user_column_totals: Vec<HourAccumulator>,
    pub sections: Vec<Section>,
    /// Hours across the whole report
    pub totals: HourAccumulator,
    /// Sum of the planned duration of every task
    pub total_duration: f64,
    /// Planned minus committed hours; `None` if no task has a planned duration
    pub total_actual_remaining: Option<f64>,
    /// Planned minus all worked hours; `None` if no task has a planned duration
    pub total_potential_remaining: Option<f64>,
    /// Fetched records that no column claimed
    pub unswept_records: usize,
}

impl Report {
    /// Create an uncompiled report for the request
    pub fn new(request: ReportRequest) -> Self {
        Self {
            stage: CompileStage::Empty,
            range_input: request.range,
            range: None,
            granularity: request.granularity,
            first_year: request.first_year,
            today: request.today,
            tasks: request.tasks,
            users: request.users,
            rows: Vec::new(),
            column_ranges: Vec::new(),
            column_totals: Vec::new(),
            user_column_totals: Vec::new(),
            sections: Vec::new(),
            totals: HourAccumulator::new(),
            total_duration: 0.0,
            total_actual_remaining: None,
            total_potential_remaining: None,
            unswept_records: 0,
        }
    }

    /// Create and compile a report in one step
    pub fn compile_request<S, R>(
        request: ReportRequest,
        source: &S,
        sections: &R,
    ) -> Result<Self, ReportError>
    where
        S: RecordSource + ?Sized,
        R: SectionRule + ?Sized,
    {
        let mut report = Self::new(request);
        report.compile(source, sections)?;
        Ok(report)
    }

    /// Compile the report.
    ///
    /// Any results of an earlier compilation are discarded first, so
    /// compiling twice against the same data gives the same figures.
    pub fn compile<S, R>(&mut self, source: &S, sections: &R) -> Result<(), ReportError>
    where
        S: RecordSource + ?Sized,
        R: SectionRule + ?Sized,
    {
        self.clear();

        let range = self.resolve_range(source)?;
        self.range = Some(range);
        self.advance(CompileStage::RangeResolved);

        if self.tasks.is_empty() {
            debug!("no tasks selected, nothing to compile");
            self.advance(CompileStage::Sectioned);
            return Ok(());
        }

        self.add_rows();
        self.advance(CompileStage::RowsBuilt);

        self.add_columns(source, range)?;
        self.advance(CompileStage::ColumnsBuilt);

        self.calculate()?;
        self.advance(CompileStage::Totaled);

        self.build_sections(sections)?;
        self.advance(CompileStage::Sectioned);

        Ok(())
    }

    fn advance(&mut self, stage: CompileStage) {
        debug!(from = ?self.stage, to = ?stage, "report stage");
        self.stage = stage;
    }

    /// Drop compiled state, keeping the request
    fn clear(&mut self) {
        self.stage = CompileStage::Empty;
        self.range = None;
        self.rows.clear();
        self.column_ranges.clear();
        self.column_totals.clear();
        self.user_column_totals.clear();
        self.sections.clear();
        self.totals.reset();
        self.total_duration = 0.0;
        self.total_actual_remaining = None;
        self.total_potential_remaining = None;
        self.unswept_records = 0;
    }

    fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }

    fn user_ids(&self) -> Vec<UserId> {
        self.users.iter().map(|u| u.id.clone()).collect()
    }

    fn resolve_range<S: RecordSource + ?Sized>(&self, source: &S) -> Result<DateInterval, ReportError> {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        RangeResolver::new(source, today)
            .first_year(self.first_year)
            .resolve(&self.range_input, &self.task_ids())
    }

    fn add_rows(&mut self) {
        self.rows = self.tasks.iter().map(|task| Row::new(task.id.clone())).collect();
    }

    /// Fetch every task's records once, then sweep them column by column
    fn add_columns<S: RecordSource + ?Sized>(
        &mut self,
        source: &S,
        range: DateInterval,
    ) -> Result<(), ReportError> {
        let user_ids = self.user_ids();
        let filter = if user_ids.is_empty() {
            UserFilter::All
        } else {
            UserFilter::Only(&user_ids)
        };

        let fetched = self
            .tasks
            .iter()
            .map(|task| TaskRecords::fetch(source, task, filter, range))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            tasks = fetched.len(),
            records = fetched.iter().map(TaskRecords::len).sum::<usize>(),
            "fetched records"
        );

        let mut cursors: Vec<TaskCursors<'_>> = fetched.iter().map(TaskRecords::cursors).collect();
        let users = UserIndex::new(&self.users);

        for column in columns(range, self.granularity) {
            self.add_column(column, &mut cursors, &users)?;
        }

        self.unswept_records = cursors.iter().map(TaskCursors::remaining).sum();
        if self.unswept_records > 0 {
            warn!(
                unswept = self.unswept_records,
                "records outside the report range were not counted"
            );
        }
        Ok(())
    }

    /// Sweep one column for every task, folding cells into rows and the column total
    fn add_column(
        &mut self,
        column: DateInterval,
        cursors: &mut [TaskCursors<'_>],
        users: &UserIndex,
    ) -> Result<(), ReportError> {
        if cursors.len() != self.rows.len() {
            return Err(ReportError::IndexMismatch {
                what: "task record lists",
                expected: self.rows.len(),
                found: cursors.len(),
            });
        }

        let mut column_total = HourAccumulator::new();
        for (row, task_cursors) in self.rows.iter_mut().zip(cursors.iter_mut()) {
            let cell = task_cursors.sweep(&column, users);
            column_total.add(&cell.hours);
            row.add_cell(cell);
        }

        trace!(%column, total = column_total.total(), "column added");
        self.column_ranges.push(column);
        self.column_totals.push(column_total);
        Ok(())
    }

    /// Grand total, remaining-hours projection and per-user totals
    fn calculate(&mut self) -> Result<(), ReportError> {
        if self.rows.len() != self.tasks.len() {
            return Err(ReportError::IndexMismatch {
                what: "rows",
                expected: self.tasks.len(),
                found: self.rows.len(),
            });
        }

        self.total_duration = self.tasks.iter().map(|t| t.duration).sum();
        let mut remaining = RemainingHours::new(self.total_duration);

        self.totals.reset();
        for (row, task) in self.rows.iter().zip(&self.tasks) {
            self.totals.add(&row.totals);
            remaining.include(task.duration, &row.totals);
        }
        self.total_actual_remaining = remaining.actual;
        self.total_potential_remaining = remaining.potential;

        let user_count = self.users.len();
        for row in &mut self.rows {
            row.calculate_user_totals(user_count);
        }
        self.user_column_totals = user_column_totals(&self.rows, user_count);

        debug!(
            committed = self.totals.committed,
            not_committed = self.totals.not_committed,
            "report totals"
        );
        Ok(())
    }

    /// Group rows into sections wherever the rule says one begins
    fn build_sections<R: SectionRule + ?Sized>(&mut self, rule: &R) -> Result<(), ReportError> {
        let column_count = self.column_ranges.len();
        let user_count = self.users.len();
        let mut sections: Vec<Section> = Vec::new();
        let mut previous: Option<&Task> = None;

        for (index, (row, task)) in self.rows.iter().zip(&self.tasks).enumerate() {
            if rule.is_new_section(previous, task) {
                sections.push(Section::new(index, column_count, user_count));
            }
            let section = sections
                .last_mut()
                .ok_or(ReportError::NoOpenSection { row: index })?;
            section.add_row(row)?;
            previous = Some(task);
        }

        debug!(sections = sections.len(), "sections built");
        self.sections = sections;
        Ok(())
    }

    // ========================================================================
    // Presentation helpers
    // ========================================================================

    pub fn is_compiled(&self) -> bool {
        self.stage == CompileStage::Sectioned
    }

    pub fn column_count(&self) -> usize {
        self.column_ranges.len()
    }

    /// Label of the report's granularity
    pub fn label(&self) -> &'static str {
        self.granularity.label()
    }

    /// Title shown once alongside the column headings
    pub fn column_title(&self) -> &'static str {
        self.granularity.column_title()
    }

    /// The whole report range as "DD-Mon-YYYY to DD-Mon-YYYY"
    pub fn display_range(&self) -> Option<String> {
        self.range.as_ref().map(heading_total)
    }

    fn column_range(&self, index: usize) -> Result<&DateInterval, ReportError> {
        self.column_ranges
            .get(index)
            .ok_or(ReportError::ColumnOutOfRange {
                index,
                count: self.column_ranges.len(),
            })
    }

    /// Heading for the column at `index`
    pub fn column_heading(&self, index: usize) -> Result<String, ReportError> {
        Ok(self.granularity.heading(self.column_range(index)?))
    }

    /// Does the column at `index` only hold part of a period?
    ///
    /// Known limitation: this compares the column, which has already been
    /// clipped to the report range, against that same range. It therefore
    /// never reports a partial column for a compiled report. Detecting
    /// partial periods properly needs the unclipped period boundaries.
    pub fn partial_column(&self, index: usize) -> Result<bool, ReportError> {
        let column = self.column_range(index)?;
        Ok(self
            .range
            .is_some_and(|range| column.start < range.start || column.end > range.end))
    }

    /// Index of the row showing `task`
    pub fn row_index(&self, task: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task)
    }

    /// Index of the section containing row `row`
    pub fn section_of_row(&self, row: usize) -> Option<usize> {
        self.sections.iter().position(|s| s.rows().contains(&row))
    }
}
