//! Single-pass record sweep
//!
//! Each task's records are fetched once, sorted latest first. A
//! [`RecordCursor`] walks such a list from its end (the earliest record)
//! towards its start, so visiting the report's columns in ascending order
//! consumes every record exactly once:
//!
//! ```text
//! records:  [ Mar 02, Feb 14, Feb 01, Jan 20, Jan 03 ]
//!                                             ^ cursor
//! column Jan  -> takes Jan 03, Jan 20
//! column Feb  -> takes Feb 01, Feb 14
//! column Mar  -> takes Mar 02
//! ```
//!
//! The total work for a task is O(records + columns). The record lists are
//! never modified; only the cursors move. Correctness depends on the columns
//! being visited in ascending order and tiling the report range, since a
//! record the cursor has passed is never looked at again.

use std::collections::HashMap;

use hourbook_core::{
    DateInterval, HourAccumulator, RecordSource, ReportError, Task, TimeRecord, User, UserFilter,
};

use crate::lattice::Cell;

/// Read position in a list of records sorted latest first
#[derive(Clone, Debug)]
pub struct RecordCursor<'a> {
    records: &'a [TimeRecord],
    /// Records `[0, remaining)` have not been consumed yet
    remaining: usize,
}

impl<'a> RecordCursor<'a> {
    pub fn new(records: &'a [TimeRecord]) -> Self {
        debug_assert!(
            records.windows(2).all(|pair| pair[0].date >= pair[1].date),
            "records must be sorted latest first"
        );
        Self {
            records,
            remaining: records.len(),
        }
    }

    /// Earliest record not yet consumed
    pub fn peek(&self) -> Option<&'a TimeRecord> {
        self.remaining.checked_sub(1).map(|index| &self.records[index])
    }

    pub fn advance(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Number of records not yet consumed
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Position of each report user in per-user breakdowns
#[derive(Clone, Debug, Default)]
pub struct UserIndex {
    positions: HashMap<String, usize>,
    len: usize,
}

impl UserIndex {
    pub fn new(users: &[User]) -> Self {
        let mut positions = HashMap::with_capacity(users.len());
        for (index, user) in users.iter().enumerate() {
            // First occurrence wins if a user is listed twice
            positions.entry(user.id.clone()).or_insert(index);
        }
        Self {
            positions,
            len: users.len(),
        }
    }

    pub fn position(&self, user: &str) -> Option<usize> {
        self.positions.get(user).copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A task's records, fetched once for the whole report range
#[derive(Clone, Debug, Default)]
pub struct TaskRecords {
    pub committed: Vec<TimeRecord>,
    pub not_committed: Vec<TimeRecord>,
}

impl TaskRecords {
    /// Fetch both record lists for a task from the source
    pub fn fetch<S: RecordSource + ?Sized>(
        source: &S,
        task: &Task,
        users: UserFilter<'_>,
        range: DateInterval,
    ) -> Result<Self, ReportError> {
        Ok(Self {
            committed: source.committed(task, users, range)?,
            not_committed: source.not_committed(task, users, range)?,
        })
    }

    /// Fresh cursors over both lists
    pub fn cursors(&self) -> TaskCursors<'_> {
        TaskCursors {
            committed: RecordCursor::new(&self.committed),
            not_committed: RecordCursor::new(&self.not_committed),
        }
    }

    pub fn len(&self) -> usize {
        self.committed.len() + self.not_committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Committed and not-committed cursors for one task
#[derive(Clone, Debug)]
pub struct TaskCursors<'a> {
    pub committed: RecordCursor<'a>,
    pub not_committed: RecordCursor<'a>,
}

impl TaskCursors<'_> {
    /// Records left over once sweeping is finished
    pub fn remaining(&self) -> usize {
        self.committed.remaining() + self.not_committed.remaining()
    }

    /// Build the cell for `column`, consuming the records that fall in it
    pub fn sweep(&mut self, column: &DateInterval, users: &UserIndex) -> Cell {
        sweep_cell(column, &mut self.committed, &mut self.not_committed, users)
    }
}

/// Build the cell for `column` from the two cursors.
///
/// Records inside the column are summed and, where their user is one of the
/// report users, also added to that user's breakdown slot.
pub fn sweep_cell(
    column: &DateInterval,
    committed: &mut RecordCursor<'_>,
    not_committed: &mut RecordCursor<'_>,
    users: &UserIndex,
) -> Cell {
    let mut cell = Cell::new(users.len());

    cell.hours.committed = sweep_list(
        column,
        committed,
        users,
        &mut cell.user_data,
        HourAccumulator::add_committed,
    );
    cell.hours.not_committed = sweep_list(
        column,
        not_committed,
        users,
        &mut cell.user_data,
        HourAccumulator::add_not_committed,
    );

    cell
}

fn sweep_list(
    column: &DateInterval,
    cursor: &mut RecordCursor<'_>,
    users: &UserIndex,
    user_data: &mut [HourAccumulator],
    route: fn(&mut HourAccumulator, f64),
) -> f64 {
    let mut total = 0.0;

    while let Some(record) = cursor.peek() {
        if !column.contains(record.date) {
            break;
        }
        total += record.hours;
        if let Some(slot) = users.position(&record.user).and_then(|i| user_data.get_mut(i)) {
            route(slot, record.hours);
        }
        cursor.advance();
    }

    total
}
