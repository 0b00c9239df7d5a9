use super::{Engine, EngineError};
use crate::clock;
use crate::dispatcher::{RunOrigin, RunSummary};
use crate::executor::ProbeResult;
use crate::progress::TaskProgress;
use crate::scheduler::{describe_cron_expr, CronSpec, ScheduleError, TaskScheduleInfo};
use crate::task::{Task, TaskDraft, TaskPage, TaskSummary};
use crate::variables::TaskPreview;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronPreview {
    pub cron_expr: String,
    pub description: String,
    pub next_run_time: String,
}

impl Engine {
    // ========================================================================
    // Task CRUD
    // ========================================================================

    pub fn list_tasks(&self, page: usize, page_size: usize) -> TaskPage {
        self.tasks.page(page, page_size)
    }

    pub fn get_task(&self, task_id: &str) -> Result<Task, EngineError> {
        self.tasks
            .get(task_id)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))
    }

    pub fn task_summary(&self, task_id: &str) -> Result<TaskSummary, EngineError> {
        self.get_task(task_id).map(|task| task.summary())
    }

    pub fn create_task(&self, draft: TaskDraft) -> Result<Task, EngineError> {
        draft.validate()?;
        let task = draft.into_task(clock::unix_now());
        self.tasks.insert(task.clone());
        info!("Created task {} ({})", task.id, task.name);
        self.save_tasks_now()?;
        Ok(task)
    }

    /// Applies the draft to an existing task. A scheduled task is re-registered
    /// with its new expression, or unscheduled if the expression was removed.
    pub fn update_task(&self, task_id: &str, draft: TaskDraft) -> Result<Task, EngineError> {
        draft.validate()?;
        let now = clock::unix_now();
        let task = self
            .tasks
            .update(task_id, move |task| draft.apply_to(task, now))
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;
        info!("Updated task {}", task_id);

        if self.scheduler.is_scheduled(task_id) {
            if task.cron_expr.is_some() {
                self.scheduler.schedule(task_id)?;
            } else {
                self.scheduler.unschedule(task_id)?;
            }
        }
        self.save_tasks_now()?;
        Ok(task)
    }

    /// Removes the task with its schedule, any live run and its logs.
    pub fn delete_task(&self, task_id: &str) -> Result<(), EngineError> {
        if !self.tasks.contains(task_id) {
            return Err(EngineError::TaskNotFound(task_id.to_string()));
        }
        match self.scheduler.unschedule(task_id) {
            Ok(()) | Err(ScheduleError::NotScheduled(_)) => {}
            Err(e) => return Err(e.into()),
        }
        self.progress.stop(task_id);
        self.tasks.remove(task_id);
        let had_logs = self.logs.clear_task(task_id);
        info!("Deleted task {}", task_id);

        self.save_tasks_now()?;
        if had_logs {
            self.save_logs_now()?;
        }
        Ok(())
    }

    // ========================================================================
    // Runs
    // ========================================================================

    /// Starts a run in the background. The handle resolves when it finishes.
    pub fn execute_task(&self, task_id: &str) -> Result<JoinHandle<RunSummary>, EngineError> {
        Ok(self.dispatcher.start(task_id, RunOrigin::Manual)?)
    }

    pub fn stop_task(&self, task_id: &str) -> Result<(), EngineError> {
        let task = self.get_task(task_id)?;
        if !self.progress.stop(task_id) {
            return Err(EngineError::NotRunning(task.name));
        }
        self.tasks.set_running(task_id, false);
        self.writer.save_tasks();
        info!("Stopped task {}", task_id);
        Ok(())
    }

    pub fn progress(&self, task_id: &str) -> TaskProgress {
        self.progress.get(task_id)
    }

    /// Sends one request for a saved task.
    pub async fn test_task(&self, task_id: &str) -> Result<ProbeResult, EngineError> {
        let task = self.get_task(task_id)?;
        let variant = self.variables.snapshot().single_variant(&task);
        Ok(self.executor.probe(&variant).await)
    }

    /// Sends one request for a task that has not been saved.
    pub async fn test_draft(&self, draft: TaskDraft) -> Result<ProbeResult, EngineError> {
        draft.validate_request()?;
        let task = draft.into_task(clock::unix_now());
        let variant = self.variables.snapshot().single_variant(&task);
        Ok(self.executor.probe(&variant).await)
    }

    pub fn preview_task(&self, task_id: &str) -> Result<TaskPreview, EngineError> {
        let task = self.get_task(task_id)?;
        Ok(self.variables.snapshot().preview(&task))
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    pub fn schedule_task(&self, task_id: &str) -> Result<TaskScheduleInfo, EngineError> {
        self.scheduler.schedule(task_id)?;
        Ok(self.scheduler.schedule_info(task_id))
    }

    pub fn unschedule_task(&self, task_id: &str) -> Result<(), EngineError> {
        self.get_task(task_id)?;
        Ok(self.scheduler.unschedule(task_id)?)
    }

    pub fn schedule_info(&self, task_id: &str) -> Result<TaskScheduleInfo, EngineError> {
        self.get_task(task_id)?;
        Ok(self.scheduler.schedule_info(task_id))
    }

    pub fn scheduled_tasks(&self) -> Vec<String> {
        self.scheduler.scheduled_task_ids()
    }

    /// Fires a scheduled run now, as the cron loop would.
    pub fn trigger_scheduled(&self, task_id: &str) -> Option<JoinHandle<()>> {
        self.scheduler.trigger(task_id)
    }

    pub fn describe_cron(&self, expr: &str) -> Result<CronPreview, EngineError> {
        let spec = CronSpec::parse(expr)?;
        let next_run_time = spec.next_run_display().unwrap_or_else(|e| {
            warn!("No next run for '{}': {}", expr, e);
            String::new()
        });
        Ok(CronPreview {
            cron_expr: spec.expr().to_string(),
            description: describe_cron_expr(spec.expr()),
            next_run_time,
        })
    }
}
