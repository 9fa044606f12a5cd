//! Scheduler engine: accepts submissions, dispatches them through the
//! timer, and owns every status transition.
//!
//! Shared state is the [`TaskStore`] plus the live-handle map. A handle
//! leaves the map exactly once: either `cancel` takes it, or the task body
//! drops it after reaching a terminal state.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use taskd_core::config::SchedulerConfig;
use taskd_core::error::{Result, TaskdError};

use crate::store::TaskStore;
use crate::tasks::{TaskRecord, TaskStatus};
use crate::timer::{Job, Timer, TimerHandle, TokioTimer};
use crate::work::{SimulatedWork, WorkOutcome, WorkUnit};

/// A request to schedule one task.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub name: Option<String>,
    pub delay_secs: i64,
    pub task_type: Option<String>,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub task_id: String,
    pub delay_secs: u64,
}

/// Snapshot of task counts.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub scheduled: usize,
    pub running: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub failed: usize,
    pub live_timers: usize,
    /// Execution slots not held by a running task body.
    pub free_slots: usize,
}

type LiveHandles = DashMap<String, TimerHandle>;

pub struct SchedulerEngine {
    store: Arc<TaskStore>,
    live: Arc<LiveHandles>,
    timer: Arc<dyn Timer>,
    work: Arc<dyn WorkUnit>,
    next_id: AtomicU64,
    config: SchedulerConfig,
}

impl SchedulerEngine {
    /// Engine with the tokio timer and the simulated work body.
    pub fn new(config: SchedulerConfig) -> Self {
        let timer = Arc::new(TokioTimer::new(config.max_concurrent_tasks));
        let work = Arc::new(SimulatedWork::from_millis(config.work_duration_ms));
        Self::with_parts(config, timer, work)
    }

    pub fn with_parts(
        config: SchedulerConfig,
        timer: Arc<dyn Timer>,
        work: Arc<dyn WorkUnit>,
    ) -> Self {
        Self {
            store: Arc::new(TaskStore::new()),
            live: Arc::new(DashMap::new()),
            timer,
            work,
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Create a task and arm its timer. Must be called inside a tokio runtime.
    ///
    /// The record is in the store before this returns, so an immediate
    /// `list` sees it as `SCHEDULED`.
    pub fn submit(&self, req: SubmitRequest) -> Result<Submission> {
        let delay_secs = self.validate_delay(req.delay_secs)?;

        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let task_id = format!("task-{n}");
        let name = req
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("Task {n}"));
        let task_type = req
            .task_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.config.default_task_type.clone());

        self.store
            .append(TaskRecord::scheduled(&task_id, &name, &task_type))?;

        // Hold the map slot while arming so a zero-delay body cannot finish
        // and clear its entry before the handle is stored.
        let job = self.task_body(task_id.clone());
        match self.live.entry(task_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(self.timer.schedule_after(Duration::from_secs(delay_secs), job));
            }
            Entry::Occupied(_) => {
                return Err(TaskdError::Other(format!("timer already armed for {task_id}")));
            }
        }

        tracing::info!(
            "📅 Scheduled task: {name} (ID: {task_id}, type: {task_type}, delay: {delay_secs}s)"
        );
        Ok(Submission {
            task_id,
            delay_secs,
        })
    }

    /// Cancel a task that has not yet reached a terminal state.
    ///
    /// Unknown ids, tasks that already finished, and tasks that finish
    /// concurrently with this call all report `NotFound`.
    pub fn cancel(&self, task_id: &str) -> Result<TaskRecord> {
        let Some((_, handle)) = self.live.remove(task_id) else {
            tracing::debug!("Cancel for {task_id}: no live timer");
            return Err(TaskdError::not_found(task_id));
        };
        if handle.is_done() {
            return Err(TaskdError::not_found(task_id));
        }

        let before_fire = handle.cancel();
        match self.store.transition(task_id, TaskStatus::Cancelled) {
            Ok(record) => {
                tracing::info!(
                    "🛑 Task cancelled: {} (ID: {task_id}, {})",
                    record.name,
                    if before_fire { "before start" } else { "while running" }
                );
                Ok(record)
            }
            Err(e) => {
                tracing::debug!("Cancel for {task_id} lost the race: {e}");
                Err(TaskdError::not_found(task_id))
            }
        }
    }

    /// Every task ever submitted, in submission order.
    pub fn list(&self) -> Vec<TaskRecord> {
        self.store.list_all()
    }

    pub fn get(&self, task_id: &str) -> Result<TaskRecord> {
        self.store
            .find_by_id(task_id)
            .ok_or_else(|| TaskdError::not_found(task_id))
    }

    /// Number of timers not yet finished or cancelled.
    pub fn pending_count(&self) -> usize {
        self.live.len()
    }

    pub fn stats(&self) -> TaskStats {
        let counts = self.store.count_by_status();
        let count = |status: TaskStatus| counts.get(&status).copied().unwrap_or(0);
        TaskStats {
            total: self.store.len(),
            scheduled: count(TaskStatus::Scheduled),
            running: count(TaskStatus::Running),
            completed: count(TaskStatus::Completed),
            cancelled: count(TaskStatus::Cancelled),
            failed: count(TaskStatus::Failed),
            live_timers: self.pending_count(),
            free_slots: self.timer.available_permits(),
        }
    }

    /// Liveness probe; the engine has no failure mode that makes it unhealthy.
    pub fn health_check(&self) -> bool {
        true
    }

    /// Cancel every outstanding task. Returns how many were cancelled.
    pub fn shutdown(&self) -> usize {
        let ids: Vec<String> = self.live.iter().map(|e| e.key().clone()).collect();
        let cancelled = ids.iter().filter(|id| self.cancel(id).is_ok()).count();
        if cancelled > 0 {
            tracing::info!("🛑 Shutdown cancelled {cancelled} outstanding task(s)");
        }
        cancelled
    }

    fn validate_delay(&self, delay_secs: i64) -> Result<u64> {
        let delay = u64::try_from(delay_secs).map_err(|_| {
            TaskdError::invalid_input(format!("delay must be non-negative, got {delay_secs}"))
        })?;
        if let Some(max) = self.config.max_delay_secs {
            if delay > max {
                return Err(TaskdError::invalid_input(format!(
                    "delay {delay}s exceeds maximum of {max}s"
                )));
            }
        }
        Ok(delay)
    }

    fn task_body(&self, task_id: String) -> Job {
        let store = self.store.clone();
        let live = self.live.clone();
        let work = self.work.clone();
        Box::new(move |token| {
            async move {
                run_task(&store, &live, work.as_ref(), &task_id, token).await;
            }
            .boxed()
        })
    }
}

async fn run_task(
    store: &TaskStore,
    live: &LiveHandles,
    work: &dyn WorkUnit,
    task_id: &str,
    token: CancellationToken,
) {
    let record = match store.transition(task_id, TaskStatus::Running) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!("Skipping {task_id}: {e}");
            live.remove(task_id);
            return;
        }
    };
    tracing::info!("▶️ Executing task: {} (ID: {task_id})", record.name);

    // A panicking hook still has to leave the task in a terminal state.
    let outcome = AssertUnwindSafe(work.run(&record, token))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| WorkOutcome::Failed("work hook panicked".into()));
    let next = match &outcome {
        WorkOutcome::Completed => TaskStatus::Completed,
        WorkOutcome::Cancelled => TaskStatus::Cancelled,
        WorkOutcome::Failed(_) => TaskStatus::Failed,
    };

    match store.transition(task_id, next) {
        Ok(done) => match outcome {
            WorkOutcome::Completed => {
                tracing::info!("✅ Task completed: {} (ID: {task_id})", done.name)
            }
            WorkOutcome::Cancelled => {
                tracing::info!("🛑 Task cancelled: {} (ID: {task_id})", done.name)
            }
            WorkOutcome::Failed(reason) => {
                tracing::warn!("❌ Task failed: {} (ID: {task_id}): {reason}", done.name)
            }
        },
        Err(e) => tracing::debug!("Task {task_id} already finished: {e}"),
    }

    live.remove(task_id);
}

/// Parse the optional textual delay of a wire request.
///
/// Absent or blank input yields `default`. Sign is checked by `submit`.
pub fn parse_delay(raw: Option<&str>, default: i64) -> Result<i64> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(text) => text.parse::<i64>().map_err(|_| {
            TaskdError::invalid_input(format!(
                "delay must be a whole number of seconds, got {text:?}"
            ))
        }),
    }
}
