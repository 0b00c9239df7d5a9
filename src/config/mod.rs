mod file_config;

pub use file_config::{DispatcherConfig, ExecutorConfig, FileConfig, LogsConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub bind_address: String,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub max_workers: usize,
    pub request_timeout_secs: u64,
    pub log_retention_days: u64,
    pub prune_interval_hours: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            bind_address: "127.0.0.1".to_string(),
            port: 3100,
            logging_level: RequestsLoggingLevel::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_retention_days: 30,
            prune_interval_hours: 24,
        }
    }
}

pub const DEFAULT_MAX_WORKERS: usize = 256;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub data_dir: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,

    // Feature configs (with defaults)
    pub dispatcher: DispatcherSettings,
    pub executor: ExecutorSettings,
    pub logs: LogSettings,
}

/// Worker pool limits.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Upper clamp for a task's thread count.
    pub max_workers: usize,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

/// Per-attempt HTTP limits.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub request_timeout: Duration,
    /// Bytes of response body kept per attempt.
    pub max_body_bytes: usize,
    /// Characters of response body shown by a probe request.
    pub probe_body_chars: usize,
    /// Bytes of response body a probe request reads at most.
    pub probe_max_body_bytes: usize,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_body_bytes: 10 * 1024,
            probe_body_chars: 5000,
            probe_max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Task log entries kept per task.
    pub history_limit: usize,
    /// Zero disables pruning.
    pub retention_days: u64,
    pub prune_interval: Duration,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            history_limit: crate::logs::DEFAULT_HISTORY_LIMIT,
            retention_days: 30,
            prune_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via --data-dir or in config file")
            })?;

        if data_dir.exists() && !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let bind_address = file
            .bind_address
            .unwrap_or_else(|| cli.bind_address.clone());
        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let dispatcher_file = file.dispatcher.unwrap_or_default();
        let max_workers = dispatcher_file.max_workers.unwrap_or(cli.max_workers);
        if max_workers == 0 {
            bail!("max_workers must be greater than zero");
        }
        let dispatcher = DispatcherSettings { max_workers };

        let executor_file = file.executor.unwrap_or_default();
        let executor_defaults = ExecutorSettings::default();
        let executor = ExecutorSettings {
            request_timeout: Duration::from_secs(
                executor_file
                    .request_timeout_secs
                    .unwrap_or(cli.request_timeout_secs),
            ),
            max_body_bytes: executor_file
                .max_body_bytes
                .unwrap_or(executor_defaults.max_body_bytes),
            probe_body_chars: executor_file
                .probe_body_chars
                .unwrap_or(executor_defaults.probe_body_chars),
            probe_max_body_bytes: executor_file
                .probe_max_body_bytes
                .unwrap_or(executor_defaults.probe_max_body_bytes),
        };

        let logs_file = file.logs.unwrap_or_default();
        let logs = LogSettings {
            history_limit: logs_file
                .history_limit
                .unwrap_or(crate::logs::DEFAULT_HISTORY_LIMIT),
            retention_days: file.log_retention_days.unwrap_or(cli.log_retention_days),
            prune_interval: Duration::from_secs(
                file.prune_interval_hours
                    .unwrap_or(cli.prune_interval_hours)
                    .max(1)
                    * 60
                    * 60,
            ),
        };

        Ok(Self {
            data_dir,
            bind_address,
            port,
            logging_level,
            dispatcher,
            executor,
            logs,
        })
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
