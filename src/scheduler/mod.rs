//! Cron registrations that trigger dispatcher runs.

mod cron;

pub use cron::{describe_cron_expr, CronError, CronSpec};

use crate::clock;
use crate::dispatcher::{DispatchError, Dispatcher, RunOrigin, RunSummary};
use crate::logs::{self, LogKind, LogStatus, LogStore};
use crate::metrics;
use crate::persistence::PersistenceHandle;
use crate::progress::ProgressStore;
use crate::task::{RunStatus, Task, TaskStore};
use chrono::Local;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("task '{0}' has no cron expression")]
    NoCronExpr(String),
    #[error("task '{0}' is not scheduled")]
    NotScheduled(String),
    #[error(transparent)]
    Cron(#[from] CronError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Idle,
    Scheduled,
    Running,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskScheduleInfo {
    pub task_id: String,
    pub is_scheduled: bool,
    pub cron_expr: String,
    pub next_run_time: String,
    pub cron_description: String,
    pub status: ScheduleStatus,
    pub last_run_time: String,
    pub last_run_status: String,
    pub last_run_result: String,
}

struct ScheduleEntry {
    cron_expr: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns one trigger loop per scheduled task. Registering a task again
/// replaces its previous loop.
pub struct TaskScheduler {
    tasks: Arc<TaskStore>,
    progress: Arc<ProgressStore>,
    logs: Arc<LogStore>,
    dispatcher: Arc<Dispatcher>,
    persistence: Option<PersistenceHandle>,
    entries: RwLock<HashMap<String, ScheduleEntry>>,
    shutdown_token: CancellationToken,
}

impl TaskScheduler {
    pub fn new(
        tasks: Arc<TaskStore>,
        progress: Arc<ProgressStore>,
        logs: Arc<LogStore>,
        dispatcher: Arc<Dispatcher>,
        persistence: Option<PersistenceHandle>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            tasks,
            progress,
            logs,
            dispatcher,
            persistence,
            entries: RwLock::new(HashMap::new()),
            shutdown_token,
        }
    }

    /// Registers the task's current cron expression, replacing any earlier
    /// registration.
    pub fn schedule(self: &Arc<Self>, task_id: &str) -> Result<(), ScheduleError> {
        self.register(task_id)?;
        self.persist();
        Ok(())
    }

    fn register(self: &Arc<Self>, task_id: &str) -> Result<(), ScheduleError> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| ScheduleError::NotFound(task_id.to_string()))?;
        let expr = task
            .cron_expr
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ScheduleError::NoCronExpr(task.name.clone()))?;
        let spec = CronSpec::parse(expr)?;

        let cancel = self.shutdown_token.child_token();
        let scheduler = Arc::clone(self);
        let loop_id = task.id.clone();
        let loop_cancel = cancel.clone();
        let loop_spec = spec.clone();
        let handle = tokio::spawn(async move {
            scheduler.trigger_loop(loop_id, loop_spec, loop_cancel).await;
        });

        let previous = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let previous = entries.insert(
                task.id.clone(),
                ScheduleEntry {
                    cron_expr: spec.expr().to_string(),
                    cancel,
                    handle,
                },
            );
            metrics::set_scheduled_tasks(entries.len());
            previous
        };
        if let Some(previous) = previous {
            previous.cancel.cancel();
            debug!("Replaced schedule of task {}", task.id);
        }
        info!(
            "Scheduled task {} with '{}' ({})",
            task.id,
            spec.expr(),
            spec.describe()
        );
        Ok(())
    }

    pub fn unschedule(&self, task_id: &str) -> Result<(), ScheduleError> {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let removed = entries.remove(task_id);
            metrics::set_scheduled_tasks(entries.len());
            removed
        };
        match removed {
            Some(entry) => {
                entry.cancel.cancel();
                info!("Unscheduled task {}", task_id);
                self.persist();
                Ok(())
            }
            None => Err(ScheduleError::NotScheduled(task_id.to_string())),
        }
    }

    pub fn is_scheduled(&self, task_id: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(task_id)
    }

    pub fn scheduled_task_ids(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Expression a task is currently registered with.
    pub fn registered_expr(&self, task_id: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(task_id).map(|e| e.cron_expr.clone())
    }

    pub fn schedule_info(&self, task_id: &str) -> TaskScheduleInfo {
        let mut info = TaskScheduleInfo {
            task_id: task_id.to_string(),
            is_scheduled: false,
            cron_expr: String::new(),
            next_run_time: String::new(),
            cron_description: String::new(),
            status: ScheduleStatus::Idle,
            last_run_time: String::new(),
            last_run_status: String::new(),
            last_run_result: String::new(),
        };

        let Some(task) = self.tasks.get(task_id) else {
            info.status = ScheduleStatus::Error;
            return info;
        };
        info.cron_expr = task.cron_expr.clone().unwrap_or_default();
        info.last_run_time = task.last_run_time.clone().unwrap_or_default();
        info.last_run_status = task
            .last_run_status
            .map(|s| s.as_str().to_string())
            .unwrap_or_default();
        info.last_run_result = task.last_run_result.clone().unwrap_or_default();

        if task.is_running || self.progress.is_running(task_id) {
            info.status = ScheduleStatus::Running;
            return info;
        }
        if info.cron_expr.is_empty() {
            return info;
        }

        info.cron_description = describe_cron_expr(&info.cron_expr);
        if self.is_scheduled(task_id) {
            info.is_scheduled = true;
            info.status = ScheduleStatus::Scheduled;
            match CronSpec::parse(&info.cron_expr).and_then(|spec| spec.next_run_display()) {
                Ok(next) => info.next_run_time = next,
                Err(e) => {
                    info.status = ScheduleStatus::Error;
                    info.next_run_time = format!("failed to compute next run: {}", e);
                }
            }
        }
        info
    }

    /// Re-registers persisted task ids in the background. Ids whose task is
    /// gone or has no valid cron expression are skipped. The handle yields
    /// how many schedules were restored.
    pub fn restore(self: &Arc<Self>, task_ids: Vec<String>) -> JoinHandle<usize> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut restored = 0;
            for task_id in &task_ids {
                match scheduler.register(task_id) {
                    Ok(()) => restored += 1,
                    Err(e) => warn!("Not restoring schedule of task {}: {}", task_id, e),
                }
            }
            if restored != task_ids.len() {
                scheduler.persist();
            }
            info!("Restored {} of {} scheduled tasks", restored, task_ids.len());
            restored
        })
    }

    /// Cancels every trigger loop and waits for them to exit. Runs already in
    /// flight are left to the dispatcher.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, ScheduleEntry)> = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let drained = entries.drain().collect();
            metrics::set_scheduled_tasks(0);
            drained
        };
        for (_, entry) in &drained {
            entry.cancel.cancel();
        }
        let (task_ids, handles): (Vec<String>, Vec<JoinHandle<()>>) = drained
            .into_iter()
            .map(|(task_id, entry)| (task_id, entry.handle))
            .unzip();
        for (task_id, result) in task_ids.iter().zip(join_all(handles).await) {
            if let Err(e) = result {
                error!("Trigger loop of task {} ended abnormally: {}", task_id, e);
            }
        }
        info!("Task scheduler stopped");
    }

    /// Fires one scheduled run now. Returns `None` when the trigger was
    /// dropped because the task is missing or still running.
    pub fn trigger(self: &Arc<Self>, task_id: &str) -> Option<JoinHandle<()>> {
        let Some(task) = self.tasks.get(task_id) else {
            warn!("Scheduled task {} no longer exists", task_id);
            metrics::record_schedule_trigger("failed");
            return None;
        };

        if task.is_running {
            debug!("Skipping scheduled run of task {}: still running", task_id);
            self.record_skipped(&task);
            return None;
        }

        let run = match self.dispatcher.start(task_id, RunOrigin::Scheduled) {
            Ok(run) => run,
            Err(DispatchError::AlreadyRunning(_)) => {
                debug!("Skipping scheduled run of task {}: run started meanwhile", task_id);
                self.record_skipped(&task);
                return None;
            }
            Err(e) => {
                warn!("Scheduled run of task {} failed to start: {}", task_id, e);
                self.tasks.record_last_run(
                    task_id,
                    clock::display_now(),
                    RunStatus::Failed,
                    e.to_string(),
                );
                metrics::record_schedule_trigger("failed");
                return None;
            }
        };
        metrics::record_schedule_trigger("started");
        self.tasks.record_last_run(
            task_id,
            clock::display_now(),
            RunStatus::Running,
            "Scheduled run in progress...".to_string(),
        );

        let scheduler = Arc::clone(self);
        let task_id = task_id.to_string();
        Some(tokio::spawn(async move {
            match run.await {
                Ok(summary) => scheduler.record_scheduled_result(&task_id, &summary),
                Err(e) => {
                    error!("Scheduled run of task {} panicked: {}", task_id, e);
                    scheduler.tasks.record_last_run(
                        &task_id,
                        clock::display_now(),
                        RunStatus::Failed,
                        format!("run aborted: {}", e),
                    );
                }
            }
            if let Some(persistence) = &scheduler.persistence {
                persistence.save_tasks();
            }
        }))
    }

    fn record_skipped(&self, task: &Task) {
        self.logs.append(
            &task.id,
            logs::new_entry(
                &task.id,
                LogKind::Schedule,
                LogStatus::Skipped,
                format!(
                    "Scheduled run of task '{}' skipped: previous run still in progress",
                    task.name
                ),
            ),
        );
        metrics::record_schedule_trigger("skipped");
    }

    fn record_scheduled_result(&self, task_id: &str, summary: &RunSummary) {
        let (status, result) = scheduled_result(summary);
        self.tasks
            .record_last_run(task_id, clock::display_now(), status, result);
    }

    async fn trigger_loop(self: Arc<Self>, task_id: String, spec: CronSpec, cancel: CancellationToken) {
        loop {
            let now = Local::now();
            let next = match spec.next_after(&now) {
                Ok(next) => next,
                Err(e) => {
                    error!("Stopping trigger loop of task {}: {}", task_id, e);
                    break;
                }
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!("Task {} next fires at {} (in {:?})", task_id, next, wait);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.trigger(&task_id);
                }
                _ = cancel.cancelled() => {
                    debug!("Trigger loop of task {} cancelled", task_id);
                    break;
                }
            }
        }
    }

    fn persist(&self) {
        if let Some(persistence) = &self.persistence {
            persistence.save_schedules(self.scheduled_task_ids());
        }
    }
}

/// Last-run status and result for a finished scheduled run.
pub fn scheduled_result(summary: &RunSummary) -> (RunStatus, String) {
    if summary.success_count > 0 {
        (
            RunStatus::Success,
            format!(
                "Succeeded {} times, failed {} times",
                summary.success_count,
                summary.total_attempts - summary.success_count
            ),
        )
    } else {
        (
            RunStatus::Failed,
            format!("All {} requests failed", summary.total_attempts),
        )
    }
}
