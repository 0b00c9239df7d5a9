use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use http_task_runner::config;
use http_task_runner::engine::{Engine, EngineSettings};
use http_task_runner::metrics;
use http_task_runner::persistence::JsonFileStore;
use http_task_runner::server::{run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Cannot read cwd: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the JSON data files. Created if missing.
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// The address to bind the API to.
    #[clap(long, default_value = "127.0.0.1")]
    pub bind_address: String,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3100)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Upper bound on concurrent workers for a single run.
    #[clap(long, default_value_t = config::DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,

    /// Timeout in seconds for each outgoing request.
    #[clap(long, default_value_t = config::DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Number of days to retain task logs. Set to 0 to disable pruning.
    #[clap(long, default_value_t = 30)]
    pub log_retention_days: u64,

    /// Interval in hours between pruning runs. Only used if log_retention_days > 0.
    #[clap(long, default_value_t = 24)]
    pub prune_interval_hours: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            data_dir: args.data_dir.clone(),
            bind_address: args.bind_address.clone(),
            port: args.port,
            logging_level: args.logging_level.clone(),
            max_workers: args.max_workers,
            request_timeout_secs: args.request_timeout_secs,
            log_retention_days: args.log_retention_days,
            prune_interval_hours: args.prune_interval_hours,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  data_dir: {:?}", app_config.data_dir);
    info!("  port: {}", app_config.port);
    info!("  max_workers: {}", app_config.dispatcher.max_workers);
    info!(
        "  request_timeout: {}s",
        app_config.executor.request_timeout.as_secs()
    );

    metrics::init_metrics();

    let persistence = Arc::new(JsonFileStore::new(&app_config.data_dir)?);
    let shutdown_token = CancellationToken::new();
    let engine = Engine::open(
        persistence,
        EngineSettings::from(&app_config),
        shutdown_token.clone(),
    )?;

    let _restore = engine.restore_schedules()?;
    let _retention = engine.spawn_retention();

    let server_config = ServerConfig::from(&app_config);
    let signal_token = shutdown_token.clone();
    let shutdown_signal = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, initiating graceful shutdown");
            }
            _ = signal_token.cancelled() => {}
        }
    };

    info!("Ready to serve at {}:{}!", app_config.bind_address, app_config.port);
    let result = run_server(server_config, Arc::clone(&engine), shutdown_signal).await;
    if let Err(e) = &result {
        error!("HTTP server stopped: {:#}", e);
    }

    engine.shutdown().await;
    info!("Shutdown complete");
    result
}
