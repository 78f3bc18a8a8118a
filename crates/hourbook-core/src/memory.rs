//! In-memory record source
//!
//! Holds a complete dataset of tasks, users and time records and answers
//! [`RecordSource`] queries against it. The CLI loads one of these from a
//! JSON file; tests build them directly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{DateInterval, RecordSource, SourceError, Task, TaskId, TimeRecord, User, UserFilter, UserId};

/// One stored time record, tagged with its task and commit state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub task: TaskId,
    pub user: UserId,
    pub date: NaiveDate,
    pub hours: f64,
    #[serde(default)]
    pub committed: bool,
}

impl RecordEntry {
    pub fn committed(task: &str, user: &str, date: NaiveDate, hours: f64) -> Self {
        Self {
            task: task.into(),
            user: user.into(),
            date,
            hours,
            committed: true,
        }
    }

    pub fn not_committed(task: &str, user: &str, date: NaiveDate, hours: f64) -> Self {
        Self {
            committed: false,
            ..Self::committed(task, user, date, hours)
        }
    }
}

/// A complete dataset as stored on disk
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub records: Vec<RecordEntry>,
}

impl Dataset {
    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

/// [`RecordSource`] backed by a vector of records
#[derive(Clone, Debug, Default)]
pub struct MemoryRecordSource {
    records: Vec<RecordEntry>,
}

impl MemoryRecordSource {
    pub fn new(records: Vec<RecordEntry>) -> Self {
        Self { records }
    }

    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self::new(dataset.records.clone())
    }

    pub fn push(&mut self, record: RecordEntry) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn dates_for<'a>(&'a self, tasks: &'a [TaskId]) -> impl Iterator<Item = NaiveDate> + 'a {
        self.records
            .iter()
            .filter(move |r| tasks.iter().any(|t| *t == r.task))
            .map(|r| r.date)
    }

    fn fetch(
        &self,
        task: &Task,
        users: UserFilter<'_>,
        range: DateInterval,
        committed: bool,
    ) -> Vec<TimeRecord> {
        let mut found: Vec<TimeRecord> = self
            .records
            .iter()
            .filter(|r| r.committed == committed && r.task == task.id)
            .filter(|r| range.contains(r.date) && users.matches(&r.user))
            .map(|r| TimeRecord::new(r.date, r.hours, r.user.clone()))
            .collect();

        // Latest first; the stable sort keeps insertion order within a day
        found.sort_by(|a, b| b.date.cmp(&a.date));
        found
    }
}

impl RecordSource for MemoryRecordSource {
    fn earliest_record(&self, tasks: &[TaskId]) -> Result<Option<NaiveDate>, SourceError> {
        Ok(self.dates_for(tasks).min())
    }

    fn latest_record(&self, tasks: &[TaskId]) -> Result<Option<NaiveDate>, SourceError> {
        Ok(self.dates_for(tasks).max())
    }

    fn committed(
        &self,
        task: &Task,
        users: UserFilter<'_>,
        range: DateInterval,
    ) -> Result<Vec<TimeRecord>, SourceError> {
        Ok(self.fetch(task, users, range, true))
    }

    fn not_committed(
        &self,
        task: &Task,
        users: UserFilter<'_>,
        range: DateInterval,
    ) -> Result<Vec<TimeRecord>, SourceError> {
        Ok(self.fetch(task, users, range, false))
    }
}
