//! Configuration for taskd, loaded from `~/.taskd/config.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TaskdError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaskdConfig {
    pub gateway: GatewayConfig,
    pub scheduler: SchedulerConfig,
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for non-API paths.
    pub web_dir: String,
    /// Send `Access-Control-Allow-Origin: *` on every response.
    pub cors: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            web_dir: "web".into(),
            cors: true,
        }
    }
}

impl GatewayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Scheduler engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Size of the runtime worker pool.
    pub worker_threads: usize,
    /// Upper bound on task bodies executing at once.
    pub max_concurrent_tasks: usize,
    pub default_delay_secs: i64,
    pub default_task_type: String,
    /// How long the simulated task body runs.
    pub work_duration_ms: u64,
    /// Largest accepted delay; `None` accepts any non-negative delay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_secs: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 10,
            max_concurrent_tasks: 10,
            default_delay_secs: 5,
            default_task_type: "simple".into(),
            work_duration_ms: 2000,
            max_delay_secs: None,
        }
    }
}

impl TaskdConfig {
    /// `~/.taskd`
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".taskd")
    }

    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from the default path, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path. A missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TaskdError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| TaskdError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TaskdError::config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.scheduler;
        if s.worker_threads == 0 {
            return Err(TaskdError::config("scheduler.worker_threads must be at least 1"));
        }
        if s.max_concurrent_tasks == 0 {
            return Err(TaskdError::config("scheduler.max_concurrent_tasks must be at least 1"));
        }
        if s.default_delay_secs < 0 {
            return Err(TaskdError::config("scheduler.default_delay_secs must be non-negative"));
        }
        Ok(())
    }
}
