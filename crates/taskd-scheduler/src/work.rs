//! Work-unit hook: what a task actually does once it fires.
//!
//! Task type is reported but never dispatched upon: every task runs the
//! same hook.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::tasks::TaskRecord;

/// How a task body ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    Completed,
    /// The cancellation token was observed mid-body.
    Cancelled,
    Failed(String),
}

/// The body executed for a fired task.
///
/// Implementations should check `cancel` at their await points and return
/// [`WorkOutcome::Cancelled`] once it fires.
#[async_trait]
pub trait WorkUnit: Send + Sync {
    async fn run(&self, task: &TaskRecord, cancel: CancellationToken) -> WorkOutcome;
}

/// Sleeps for a fixed duration, interruptible by the token.
pub struct SimulatedWork {
    duration: Duration,
}

impl SimulatedWork {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

impl Default for SimulatedWork {
    fn default() -> Self {
        Self::from_millis(2000)
    }
}

#[async_trait]
impl WorkUnit for SimulatedWork {
    async fn run(&self, task: &TaskRecord, cancel: CancellationToken) -> WorkOutcome {
        tracing::debug!("⚙️ Simulating {:?} of work for {}", self.duration, task.id);
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => WorkOutcome::Completed,
            _ = cancel.cancelled() => WorkOutcome::Cancelled,
        }
    }
}
