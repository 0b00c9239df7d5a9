//! Fans the attempts of one run across a bounded worker pool.

mod worker;

use crate::clock;
use crate::config::DispatcherSettings;
use crate::executor::{Attempt, RequestSender};
use crate::logs::{self, DetailedLogEntry, ExecutionLog, LogKind, LogStore};
use crate::metrics;
use crate::persistence::PersistenceHandle;
use crate::progress::{ProgressStore, RunTicket};
use crate::task::{RunStatus, Task, TaskStore};
use crate::variables::{TaskVariant, VariableStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use worker::{run_worker, Job};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("task '{0}' is already running")]
    AlreadyRunning(String),
    #[error("run aborted: {0}")]
    Aborted(String),
}

/// What started a run. Only changes the wording of its log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOrigin {
    Manual,
    Scheduled,
}

impl RunOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOrigin::Manual => "manual",
            RunOrigin::Scheduled => "scheduled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Attempts whose result was collected.
    pub total_attempts: usize,
    /// Attempts the run was planned with.
    pub planned_attempts: usize,
    pub success_count: usize,
    pub duration_secs: u64,
    pub status: RunStatus,
    pub stopped: bool,
    pub log_id: String,
}

pub struct Dispatcher {
    tasks: Arc<TaskStore>,
    variables: Arc<VariableStore>,
    progress: Arc<ProgressStore>,
    logs: Arc<LogStore>,
    sender: Arc<dyn RequestSender>,
    persistence: Option<PersistenceHandle>,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(
        tasks: Arc<TaskStore>,
        variables: Arc<VariableStore>,
        progress: Arc<ProgressStore>,
        logs: Arc<LogStore>,
        sender: Arc<dyn RequestSender>,
        persistence: Option<PersistenceHandle>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            tasks,
            variables,
            progress,
            logs,
            sender,
            persistence,
            settings,
        }
    }

    /// Claims the task's progress row and launches the run in the background.
    /// Fails immediately if the task is unknown or a run is already live.
    pub fn start(
        self: &Arc<Self>,
        task_id: &str,
        origin: RunOrigin,
    ) -> Result<JoinHandle<RunSummary>, DispatchError> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| DispatchError::NotFound(task_id.to_string()))?;

        let variants = self.variables.snapshot().expand(&task);
        let total = variants.len() * task.times as usize;

        let ticket = self
            .progress
            .try_start(&task.id, total, clock::unix_now())
            .ok_or_else(|| DispatchError::AlreadyRunning(task.name.clone()))?;
        self.tasks.set_running(&task.id, true);
        metrics::run_started();

        info!(
            "Starting {} run of task {} ({} variants x {} times, {} threads)",
            origin.as_str(),
            task.id,
            variants.len(),
            task.times,
            task.threads
        );

        let dispatcher = Arc::clone(self);
        Ok(tokio::spawn(async move {
            dispatcher.run_variants(task, variants, ticket, origin).await
        }))
    }

    /// Runs a task to completion (or until stopped).
    pub async fn run(
        self: &Arc<Self>,
        task_id: &str,
        origin: RunOrigin,
    ) -> Result<RunSummary, DispatchError> {
        self.start(task_id, origin)?
            .await
            .map_err(|e| DispatchError::Aborted(e.to_string()))
    }

    pub fn worker_count(&self, threads: u32, total: usize) -> usize {
        (threads as usize)
            .clamp(1, self.settings.max_workers.max(1))
            .min(total.max(1))
    }

    async fn run_variants(
        self: Arc<Self>,
        task: Task,
        variants: Vec<TaskVariant>,
        ticket: RunTicket,
        origin: RunOrigin,
    ) -> RunSummary {
        let started = Instant::now();
        let variant_count = variants.len();
        let total = variant_count * task.times as usize;
        let capacity = total.max(1);

        let (job_tx, job_rx) = mpsc::channel::<Job>(capacity);
        let (result_tx, mut result_rx) = mpsc::channel::<Attempt>(capacity);
        let job_queue = Arc::new(Mutex::new(job_rx));

        let workers = if total == 0 {
            0
        } else {
            self.worker_count(task.threads, total)
        };
        for _ in 0..workers {
            tokio::spawn(run_worker(
                Arc::clone(&self.sender),
                Arc::clone(&job_queue),
                result_tx.clone(),
                ticket.cancel.clone(),
            ));
        }
        drop(result_tx);

        for variant in variants {
            let variant = Arc::new(variant);
            for repetition in 0..task.times {
                let job = Job {
                    variant: Arc::clone(&variant),
                    repetition,
                };
                if job_tx.send(job).await.is_err() {
                    break;
                }
            }
        }
        drop(job_tx);

        let mut entries: Vec<DetailedLogEntry> = Vec::new();
        let mut success_count = 0;
        let mut stopped = false;
        while entries.len() < total {
            tokio::select! {
                biased;
                _ = ticket.cancel.cancelled() => {
                    stopped = true;
                    break;
                }
                attempt = result_rx.recv() => {
                    let Some(attempt) = attempt else {
                        break;
                    };
                    metrics::record_attempt(
                        attempt.success,
                        Duration::from_millis(attempt.entry.response_time),
                    );
                    if attempt.success {
                        success_count += 1;
                    }
                    entries.push(attempt.entry);
                    self.progress.set_current(&task.id, ticket.run_id, entries.len());
                }
            }
        }
        // Late results from a stopped run are dropped with the channel.
        drop(result_rx);

        let duration = started.elapsed();
        let summary = self.record_completion(
            &task,
            origin,
            variant_count,
            total,
            entries,
            success_count,
            stopped,
            duration,
        );

        metrics::run_finished();
        metrics::record_run(summary.status.as_str(), origin.as_str(), duration);
        if self.progress.finish(&task.id, ticket.run_id) {
            self.tasks.set_running(&task.id, false);
        }
        if let Some(persistence) = &self.persistence {
            persistence.save_logs();
            persistence.save_tasks();
        }

        info!(
            "Run of task {} {}: {}/{} succeeded in {}s",
            task.id,
            if stopped { "stopped" } else { "finished" },
            summary.success_count,
            summary.planned_attempts,
            summary.duration_secs
        );
        summary
    }

    #[allow(clippy::too_many_arguments)]
    fn record_completion(
        &self,
        task: &Task,
        origin: RunOrigin,
        variant_count: usize,
        total: usize,
        entries: Vec<DetailedLogEntry>,
        success_count: usize,
        stopped: bool,
        duration: Duration,
    ) -> RunSummary {
        let completed = entries.len();
        let duration_secs = duration.as_secs();
        let status = RunStatus::from_counts(success_count, total);
        let subject = match origin {
            RunOrigin::Manual => "Task",
            RunOrigin::Scheduled => "Scheduled task",
        };

        let message = if stopped {
            format!(
                "{} '{}' was stopped after {}s, success: {}/{} ({} planned)",
                subject, task.name, duration_secs, success_count, completed, total
            )
        } else if variant_count > 1 {
            format!(
                "{} '{}' finished in {}s, success: {}/{} (separator produced {} variants, each executed {} times)",
                subject, task.name, duration_secs, success_count, total, variant_count, task.times
            )
        } else {
            format!(
                "{} '{}' finished in {}s, success: {}/{}",
                subject, task.name, duration_secs, success_count, total
            )
        };

        let rate_base = if stopped { completed } else { total };
        let summary = format!(
            "Execution {}, success rate: {:.1}%",
            if stopped { "stopped" } else { "completed" },
            success_rate(success_count, rate_base)
        );

        let entry = logs::new_entry(&task.id, LogKind::Execution, status.into(), message);
        let log_id = entry.id.clone();
        if completed < total && !stopped {
            warn!(
                "Run of task {} collected {} of {} results",
                task.id, completed, total
            );
        }
        let execution = ExecutionLog {
            task_log_id: log_id.clone(),
            detailed_logs: entries,
            summary,
            total_requests: completed,
            success_count,
            failed_count: completed - success_count,
            duration: duration_secs,
        };
        debug!("Recording execution log {} for task {}", log_id, task.id);
        self.logs.record_run(&task.id, entry, execution);

        RunSummary {
            total_attempts: completed,
            planned_attempts: total,
            success_count,
            duration_secs,
            status,
            stopped,
            log_id,
        }
    }
}

fn success_rate(success_count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    success_count as f64 / total as f64 * 100.0
}
