//! Unified error types for taskd.

use thiserror::Error;

/// Result type alias using TaskdError.
pub type Result<T> = std::result::Result<T, TaskdError>;

#[derive(Error, Debug)]
pub enum TaskdError {
    // Scheduler errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task not found or already completed: {0}")]
    NotFound(String),

    /// A status change lost a race against another transition.
    #[error("Invalid transition for {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: String,
        from: String,
        to: String,
    },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl TaskdError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(task_id: impl Into<String>) -> Self {
        Self::NotFound(task_id.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// The task id carried by the error, if any.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::NotFound(id) => Some(id),
            Self::InvalidTransition { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}
