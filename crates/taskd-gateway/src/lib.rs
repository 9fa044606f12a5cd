//! # taskd Gateway
//! HTTP API over the scheduler engine, plus static asset serving.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | /api/schedule | POST | Submit a task (form: name, delay, type) |
//! | /api/cancel | POST | Cancel a pending or running task (form: taskId) |
//! | /api/tasks | GET | Every task in submission order |
//! | /api/tasks/{id} | GET | One task |
//! | /api/health | GET | Liveness |
//! | /api/info | GET | Version, uptime, task counts |
//! | anything else | GET | Files from the web directory |

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, GatewayServer};
