//! Timer service: delayed, cancellable execution on the tokio runtime.
//!
//! Each registration is one spawned task: sleep, wait for an execution
//! permit, claim the start slot, run the job. Cancellation races every
//! step through a [`CancellationToken`].

use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Work handed to the timer. Receives the registration's cancellation token.
pub type Job = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, ()> + Send>;

const PENDING: u8 = 0;
const STARTED: u8 = 1;
const CANCELLED: u8 = 2;

#[derive(Default)]
struct HandleState {
    phase: AtomicU8,
    done: AtomicBool,
}

/// Marks the registration done however its task exits, panics included.
struct DoneGuard(Arc<HandleState>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.done.store(true, Ordering::Release);
    }
}

/// Handle to one pending timer registration.
#[derive(Clone)]
pub struct TimerHandle {
    state: Arc<HandleState>,
    token: CancellationToken,
}

impl TimerHandle {
    /// Try to stop the job.
    ///
    /// Returns `true` if the job had not started and now never will. When it
    /// already started, the token is still triggered so the running job can
    /// stop cooperatively, and `false` is returned.
    pub fn cancel(&self) -> bool {
        let prevented = self
            .state
            .phase
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.token.cancel();
        prevented
    }

    #[cfg(test)]
    fn is_started(&self) -> bool {
        self.state.phase.load(Ordering::Acquire) == STARTED
    }

    /// The registration has finished: the job ran to the end, or never will.
    pub fn is_done(&self) -> bool {
        self.state.done.load(Ordering::Acquire)
    }
}

/// Abstraction over delayed background execution.
pub trait Timer: Send + Sync {
    /// Run `job` once, after `delay`, on a worker other than the caller.
    fn schedule_after(&self, delay: Duration, job: Job) -> TimerHandle;

    /// Jobs that could start right now without waiting for a slot.
    fn available_permits(&self) -> usize;
}

/// [`Timer`] backed by `tokio::time` and a permit pool bounding how many
/// jobs execute at once.
pub struct TokioTimer {
    permits: Arc<Semaphore>,
}

impl TokioTimer {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

impl Timer for TokioTimer {
    fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    fn schedule_after(&self, delay: Duration, job: Job) -> TimerHandle {
        let state = Arc::new(HandleState::default());
        let token = CancellationToken::new();
        let handle = TimerHandle {
            state: state.clone(),
            token: token.clone(),
        };

        let permits = self.permits.clone();
        tokio::spawn(async move {
            let _done = DoneGuard(state.clone());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => return,
            }

            // Acquire only fails on a closed semaphore; this one is never closed.
            let _permit = tokio::select! {
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
                _ = token.cancelled() => return,
            };

            if state
                .phase
                .compare_exchange(PENDING, STARTED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }

            job(token).await;
        });

        handle
    }
}
