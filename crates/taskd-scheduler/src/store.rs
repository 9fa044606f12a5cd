//! Task store: append-only, insertion-ordered history of every task.
//!
//! Records are mutated in place, only through [`TaskStore::transition`],
//! so readers always see the latest status and never a half-built record.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

use taskd_core::error::{Result, TaskdError};

use crate::tasks::{TaskRecord, TaskStatus};

#[derive(Default)]
struct Inner {
    records: Vec<TaskRecord>,
    index: HashMap<String, usize>,
}

/// Concurrency-safe container for all task records.
#[derive(Default)]
pub struct TaskStore {
    inner: RwLock<Inner>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new record. Ids must be unique.
    pub fn append(&self, record: TaskRecord) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.index.contains_key(&record.id) {
            return Err(TaskdError::invalid_input(format!(
                "duplicate task id: {}",
                record.id
            )));
        }
        let pos = inner.records.len();
        inner.index.insert(record.id.clone(), pos);
        inner.records.push(record);
        Ok(())
    }

    /// Snapshot of every record in insertion order.
    pub fn list_all(&self) -> Vec<TaskRecord> {
        self.inner.read().records.clone()
    }

    pub fn find_by_id(&self, id: &str) -> Option<TaskRecord> {
        let inner = self.inner.read();
        inner.index.get(id).map(|&pos| inner.records[pos].clone())
    }

    /// Compare-and-set status change.
    ///
    /// Succeeds only if the current status may move to `next`; terminal
    /// states also stamp `completed_at`. The first terminal write wins.
    pub fn transition(&self, id: &str, next: TaskStatus) -> Result<TaskRecord> {
        let mut inner = self.inner.write();
        let pos = *inner
            .index
            .get(id)
            .ok_or_else(|| TaskdError::not_found(id))?;
        let record = &mut inner.records[pos];

        if !record.status.can_transition_to(next) {
            return Err(TaskdError::InvalidTransition {
                task_id: id.to_string(),
                from: record.status.to_string(),
                to: next.to_string(),
            });
        }

        record.status = next;
        if next.is_terminal() {
            record.completed_at = Some(Utc::now());
        }
        Ok(record.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records currently in each status.
    pub fn count_by_status(&self) -> HashMap<TaskStatus, usize> {
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        for record in &inner.records {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        counts
    }
}
