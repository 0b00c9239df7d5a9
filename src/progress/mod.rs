//! Live per-task progress of in-flight runs.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    pub current: usize,
    pub total: usize,
    /// Unix seconds.
    pub start_time: i64,
    pub is_running: bool,
}

/// Ticket handed to the run that claimed a task's progress row.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub run_id: Uuid,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct LiveRun {
    progress: TaskProgress,
    run_id: Uuid,
    cancel: CancellationToken,
}

/// At most one live row per task. Claiming a row is the re-entrancy guard for
/// runs; every later update is keyed by the claiming run's id so a run that
/// was stopped cannot touch a newer run's row.
#[derive(Default)]
pub struct ProgressStore {
    runs: RwLock<HashMap<String, LiveRun>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeros when the task has no live run.
    pub fn get(&self, task_id: &str) -> TaskProgress {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.get(task_id).map(|r| r.progress).unwrap_or_default()
    }

    pub fn is_running(&self, task_id: &str) -> bool {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.contains_key(task_id)
    }

    pub fn active_count(&self) -> usize {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.len()
    }

    /// Atomically creates the row, or returns `None` if a run is live.
    pub fn try_start(&self, task_id: &str, total: usize, start_time: i64) -> Option<RunTicket> {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        if runs.contains_key(task_id) {
            return None;
        }
        let ticket = RunTicket {
            run_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
        };
        runs.insert(
            task_id.to_string(),
            LiveRun {
                progress: TaskProgress {
                    current: 0,
                    total,
                    start_time,
                    is_running: true,
                },
                run_id: ticket.run_id,
                cancel: ticket.cancel.clone(),
            },
        );
        Some(ticket)
    }

    /// Returns false when the row is gone or belongs to another run.
    pub fn set_current(&self, task_id: &str, run_id: Uuid, current: usize) -> bool {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        match runs.get_mut(task_id) {
            Some(run) if run.run_id == run_id => {
                run.progress.current = current;
                true
            }
            _ => false,
        }
    }

    /// Removes the row if it still belongs to `run_id`.
    pub fn finish(&self, task_id: &str, run_id: Uuid) -> bool {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        if runs.get(task_id).map(|r| r.run_id) == Some(run_id) {
            runs.remove(task_id);
            true
        } else {
            false
        }
    }

    /// Removes whatever run is live and signals it to stop. Returns false if
    /// nothing was running.
    pub fn stop(&self, task_id: &str) -> bool {
        let removed = {
            let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
            runs.remove(task_id)
        };
        match removed {
            Some(run) => {
                run.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        for (_, run) in runs.drain() {
            run.cancel.cancel();
        }
    }
}
