//! Aggregation lattice
//!
//! Cells fold into rows and column totals as they are produced; rows fold
//! into the grand total, per-user totals and sections once every cell
//! exists. All folding is plain addition of [`HourAccumulator`] values, so
//! every level of the lattice sums to the level above it.
//!
//! # Index alignment
//!
//! Nothing here stores a back-reference. A cell belongs to a (row, column)
//! pair purely by position:
//!
//! - `Row::cells[i]` and `Section::cells[i]` belong to column `i` of the report
//! - `Cell::user_data[u]`, `Row::user_totals[u]` and `Section::user_totals[u]`
//!   belong to user `u` of the report
//!
//! Construction order is the only thing that keeps these aligned.

use serde::Serialize;

use hourbook_core::{HourAccumulator, ReportError, TaskId};

// ============================================================================
// Cell
// ============================================================================

/// Hours for one task over one column range
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Cell {
    /// Hours by anybody
    pub hours: HourAccumulator,
    /// Per-user breakdown, one entry per report user
    pub user_data: Vec<HourAccumulator>,
}

impl Cell {
    /// Empty cell with a zeroed breakdown slot per user
    pub fn new(user_count: usize) -> Self {
        Self {
            hours: HourAccumulator::new(),
            user_data: vec![HourAccumulator::new(); user_count],
        }
    }

    pub fn committed(&self) -> f64 {
        self.hours.committed
    }

    pub fn not_committed(&self) -> f64 {
        self.hours.not_committed
    }

    pub fn total(&self) -> f64 {
        self.hours.total()
    }

    /// Sum of the per-user breakdown
    pub fn user_sum(&self) -> HourAccumulator {
        self.user_data.iter().sum()
    }
}

// ============================================================================
// Row
// ============================================================================

/// One task's hours across the whole report range
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Row {
    pub task_id: TaskId,
    /// Hours across all columns
    pub totals: HourAccumulator,
    pub cells: Vec<Cell>,
    /// Per-user hours across all columns
    pub user_totals: Vec<HourAccumulator>,
}

impl Row {
    pub fn new(task_id: impl Into<TaskId>) -> Self {
        Self {
            task_id: task_id.into(),
            totals: HourAccumulator::new(),
            cells: Vec::new(),
            user_totals: Vec::new(),
        }
    }

    /// Append the cell for the next column and include it in the row total
    pub fn add_cell(&mut self, cell: Cell) {
        self.totals.add(&cell.hours);
        self.cells.push(cell);
    }

    /// Sum each user's breakdown across the row's cells
    pub fn calculate_user_totals(&mut self, user_count: usize) {
        self.user_totals = (0..user_count)
            .map(|user| {
                self.cells
                    .iter()
                    .filter_map(|cell| cell.user_data.get(user))
                    .sum()
            })
            .collect();
    }
}

// ============================================================================
// Section
// ============================================================================

/// A contiguous run of rows sharing a grouping key
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Section {
    /// Index of the section's first row
    pub first_row: usize,
    /// Number of rows in the section
    pub row_count: usize,
    /// Hours across all of the section's rows and columns
    pub totals: HourAccumulator,
    /// Per-column hours across the section's rows
    pub cells: Vec<HourAccumulator>,
    /// Per-user hours across the section's rows
    pub user_totals: Vec<HourAccumulator>,
}

impl Section {
    /// Open an empty section starting at `first_row`
    pub fn new(first_row: usize, column_count: usize, user_count: usize) -> Self {
        Self {
            first_row,
            row_count: 0,
            totals: HourAccumulator::new(),
            cells: vec![HourAccumulator::new(); column_count],
            user_totals: vec![HourAccumulator::new(); user_count],
        }
    }

    /// Row indices covered by this section
    pub fn rows(&self) -> std::ops::Range<usize> {
        self.first_row..self.first_row + self.row_count
    }

    /// Fold a row's cells and per-user totals into the section
    pub fn add_row(&mut self, row: &Row) -> Result<(), ReportError> {
        if row.cells.len() != self.cells.len() {
            return Err(ReportError::IndexMismatch {
                what: "row cells",
                expected: self.cells.len(),
                found: row.cells.len(),
            });
        }
        if row.user_totals.len() != self.user_totals.len() {
            return Err(ReportError::IndexMismatch {
                what: "row user totals",
                expected: self.user_totals.len(),
                found: row.user_totals.len(),
            });
        }

        for (section_cell, cell) in self.cells.iter_mut().zip(&row.cells) {
            section_cell.add(&cell.hours);
            self.totals.add(&cell.hours);
        }
        for (section_user, user) in self.user_totals.iter_mut().zip(&row.user_totals) {
            section_user.add(user);
        }

        self.row_count += 1;
        Ok(())
    }
}

// ============================================================================
// Report-wide folds
// ============================================================================

/// Sum each user's row totals across all rows
pub fn user_column_totals(rows: &[Row], user_count: usize) -> Vec<HourAccumulator> {
    (0..user_count)
        .map(|user| {
            rows.iter()
                .filter_map(|row| row.user_totals.get(user))
                .sum()
        })
        .collect()
}

/// Planned versus worked hours across a report's tasks
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RemainingHours {
    /// Sum of every task's planned duration
    pub total_duration: f64,
    /// Planned minus committed hours, over tasks with a planned duration
    pub actual: Option<f64>,
    /// Planned minus all worked hours, over tasks with a planned duration
    pub potential: Option<f64>,
}

impl RemainingHours {
    pub fn new(total_duration: f64) -> Self {
        Self {
            total_duration,
            actual: None,
            potential: None,
        }
    }

    /// Deduct a row's hours if its task has a positive planned duration.
    ///
    /// The first such task seeds both figures at `total_duration`; tasks
    /// without a planned duration leave them untouched.
    pub fn include(&mut self, task_duration: f64, row_hours: &HourAccumulator) {
        if task_duration <= 0.0 {
            return;
        }
        let actual = self.actual.get_or_insert(self.total_duration);
        *actual -= row_hours.committed;
        let potential = self.potential.get_or_insert(self.total_duration);
        *potential -= row_hours.total();
    }
}
