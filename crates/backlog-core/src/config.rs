//! Queue configuration.
//!
//! Every value has a default; `from_env` overrides them from `BACKLOG_*`
//! environment variables.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Logical queue id. Also the key of the inventory record.
    pub site_id: String,
    /// Queue length at which `add_task` starts a run right away.
    pub min_tasks_before_run: usize,
    /// Debounce delay before a run when the queue is below the threshold.
    pub run_delay: Duration,
    /// Age after which the expiry sweep deletes a task.
    pub task_expiry: Duration,
    /// How long HTTP requests stay paused after a 401 or a server outage.
    pub unauthorized_pause: Duration,
    pub storage_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got '{value}'")]
    NotANumber { name: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("min_tasks_before_run must be at least 1")]
    ZeroMinTasks,

    #[error("site_id may only contain ASCII letters, digits, '-' and '_', got '{0}'")]
    InvalidSiteId(String),
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            site_id: "default".to_string(),
            min_tasks_before_run: 10,
            run_delay: Duration::from_secs(30),
            task_expiry: Duration::from_secs(3 * 24 * 60 * 60),
            unauthorized_pause: Duration::from_secs(5 * 60),
            storage_dir: None,
        }
    }
}

impl QueueConfig {
    /// Defaults overridden by the process environment.
    ///
    /// - `BACKLOG_SITE_ID`
    /// - `BACKLOG_MIN_TASKS`
    /// - `BACKLOG_RUN_DELAY_SECS`
    /// - `BACKLOG_TASK_EXPIRY_SECS`
    /// - `BACKLOG_PAUSE_SECS`
    /// - `BACKLOG_STORAGE_DIR`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(site_id) = lookup("BACKLOG_SITE_ID") {
            config.site_id = site_id;
        }
        if let Some(min) = parse_number(&lookup, "BACKLOG_MIN_TASKS")? {
            config.min_tasks_before_run = min as usize;
        }
        if let Some(secs) = parse_number(&lookup, "BACKLOG_RUN_DELAY_SECS")? {
            config.run_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_number(&lookup, "BACKLOG_TASK_EXPIRY_SECS")? {
            config.task_expiry = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_number(&lookup, "BACKLOG_PAUSE_SECS")? {
            config.unauthorized_pause = Duration::from_secs(secs);
        }
        if let Some(dir) = lookup("BACKLOG_STORAGE_DIR").filter(|dir| !dir.is_empty()) {
            config.storage_dir = Some(PathBuf::from(dir));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_id.trim().is_empty() {
            return Err(ConfigError::Empty("site_id"));
        }
        // the site id names the inventory record on disk
        let valid_key = self
            .site_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_key {
            return Err(ConfigError::InvalidSiteId(self.site_id.clone()));
        }
        if self.min_tasks_before_run == 0 {
            return Err(ConfigError::ZeroMinTasks);
        }
        Ok(())
    }

    pub fn task_expiry_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.task_expiry).unwrap_or(chrono::Duration::MAX)
    }
}

fn parse_number(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::NotANumber { name, value })
}
