//! Owns every store and background worker and exposes the operations the
//! API and binary need.

mod data;
mod error;
mod tasks;

pub use error::EngineError;
pub use tasks::CronPreview;

use crate::config::{AppConfig, DispatcherSettings, ExecutorSettings, LogSettings};
use crate::dispatcher::Dispatcher;
use crate::executor::HttpRequestExecutor;
use crate::logs::{LogRetention, LogStore};
use crate::persistence::{Persistence, PersistenceHandle, PersistenceWriter};
use crate::progress::ProgressStore;
use crate::scheduler::TaskScheduler;
use crate::task::TaskStore;
use crate::variables::VariableStore;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub dispatcher: DispatcherSettings,
    pub executor: ExecutorSettings,
    pub logs: LogSettings,
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            dispatcher: config.dispatcher.clone(),
            executor: config.executor.clone(),
            logs: config.logs.clone(),
        }
    }
}

pub struct Engine {
    tasks: Arc<TaskStore>,
    variables: Arc<VariableStore>,
    progress: Arc<ProgressStore>,
    logs: Arc<LogStore>,
    executor: Arc<HttpRequestExecutor>,
    dispatcher: Arc<Dispatcher>,
    scheduler: Arc<TaskScheduler>,
    persistence: Arc<dyn Persistence>,
    writer: PersistenceHandle,
    writer_task: Mutex<Option<JoinHandle<()>>>,
    settings: EngineSettings,
    shutdown_token: CancellationToken,
}

impl Engine {
    /// Loads every collection and starts the persistence writer. Must be
    /// called from within a tokio runtime.
    pub fn open(
        persistence: Arc<dyn Persistence>,
        settings: EngineSettings,
        shutdown_token: CancellationToken,
    ) -> Result<Arc<Self>> {
        let tasks = Arc::new(TaskStore::new());
        tasks.load(persistence.load_tasks().context("Failed to load tasks")?);

        let variables = Arc::new(VariableStore::new());
        variables.load(
            persistence
                .load_variables()
                .context("Failed to load variables")?,
        );

        let logs = Arc::new(LogStore::new(settings.logs.history_limit));
        logs.restore(persistence.load_logs().context("Failed to load logs")?);

        info!(
            "Loaded {} tasks and {} variables",
            tasks.len(),
            variables.all().len()
        );

        let (writer, writer_handle) = PersistenceWriter::new(
            Arc::clone(&persistence),
            Arc::clone(&tasks),
            Arc::clone(&logs),
            shutdown_token.child_token(),
        );
        let writer_task = writer.spawn();

        let progress = Arc::new(ProgressStore::new());
        let executor = Arc::new(HttpRequestExecutor::new(&settings.executor)?);
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&tasks),
            Arc::clone(&variables),
            Arc::clone(&progress),
            Arc::clone(&logs),
            executor.clone(),
            Some(writer_handle.clone()),
            settings.dispatcher.clone(),
        ));
        let scheduler = Arc::new(TaskScheduler::new(
            Arc::clone(&tasks),
            Arc::clone(&progress),
            Arc::clone(&logs),
            Arc::clone(&dispatcher),
            Some(writer_handle.clone()),
            shutdown_token.child_token(),
        ));

        Ok(Arc::new(Self {
            tasks,
            variables,
            progress,
            logs,
            executor,
            dispatcher,
            scheduler,
            persistence,
            writer: writer_handle,
            writer_task: Mutex::new(Some(writer_task)),
            settings,
            shutdown_token,
        }))
    }

    /// Re-registers the schedules saved by the previous process.
    pub fn restore_schedules(&self) -> Result<JoinHandle<usize>> {
        let ids = self
            .persistence
            .load_schedules()
            .context("Failed to load scheduled tasks")?;
        Ok(self.scheduler.restore(ids))
    }

    /// Starts periodic log pruning, or returns `None` when retention is off.
    pub fn spawn_retention(&self) -> Option<JoinHandle<()>> {
        if self.settings.logs.retention_days == 0 {
            info!("Log retention disabled");
            return None;
        }
        let retention = LogRetention::new(
            Arc::clone(&self.logs),
            Some(self.writer.clone()),
            self.settings.logs.retention_days,
            self.settings.logs.prune_interval,
        );
        Some(retention.spawn(self.shutdown_token.child_token()))
    }

    /// Waits until every save requested so far has been written.
    pub async fn flush(&self) -> Result<()> {
        self.writer.flush().await
    }

    /// Stops trigger loops and live runs, then lets the writer persist the
    /// final state.
    pub async fn shutdown(&self) {
        info!("Shutting down engine");
        self.scheduler.shutdown().await;
        self.progress.stop_all();
        for task in self.tasks.snapshot().values().filter(|t| t.is_running) {
            self.tasks.set_running(&task.id, false);
        }
        self.shutdown_token.cancel();

        let writer_task = self
            .writer_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = writer_task {
            if let Err(e) = handle.await {
                error!("Persistence writer ended abnormally: {}", e);
            }
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn save_tasks_now(&self) -> Result<(), EngineError> {
        self.persistence
            .save_tasks(&self.tasks.snapshot())
            .context("Failed to save tasks")?;
        Ok(())
    }

    fn save_variables_now(&self) -> Result<(), EngineError> {
        self.persistence
            .save_variables(&self.variables.all())
            .context("Failed to save variables")?;
        Ok(())
    }

    fn save_logs_now(&self) -> Result<(), EngineError> {
        self.persistence
            .save_logs(&self.logs.snapshot())
            .context("Failed to save logs")?;
        Ok(())
    }
}
