//! # taskd core
//! Shared error type and configuration for the taskd workspace.

pub mod config;
pub mod error;

pub use config::{GatewayConfig, SchedulerConfig, TaskdConfig};
pub use error::{Result, TaskdError};
