//! # taskd Scheduler
//!
//! In-memory delayed task scheduler.
//!
//! ## Design Principles
//! - No persistence: task history lives for the process lifetime only
//! - Tokio timers only: one sleeping task per pending registration
//! - Cooperative cancellation through `CancellationToken`, never forced aborts
//! - Every status change is a compare-and-set inside the store
//!
//! ## Architecture
//! ```text
//! SchedulerEngine
//!   ├── submit → TaskStore.append (SCHEDULED)
//!   │           └── Timer.schedule_after(delay) → live handle map
//!   ├── timer fires → RUNNING → WorkUnit.run(token)
//!   │                             ├── COMPLETED
//!   │                             ├── CANCELLED (token observed)
//!   │                             └── FAILED (hook error)
//!   └── cancel → live map remove → handle.cancel() → CANCELLED
//! ```

pub mod engine;
pub mod store;
pub mod tasks;
pub mod timer;
pub mod work;

pub use engine::{SchedulerEngine, SubmitRequest, Submission, TaskStats, parse_delay};
pub use store::TaskStore;
pub use tasks::{TaskRecord, TaskStatus};
pub use timer::{Job, Timer, TimerHandle, TokioTimer};
pub use work::{SimulatedWork, WorkOutcome, WorkUnit};
