use super::models::{ExecutionLog, TaskLogEntry};
use crate::clock;
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Everything the log store holds, in the shape it is persisted in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogSnapshot {
    pub task_logs: HashMap<String, Vec<TaskLogEntry>>,
    pub execution_logs: HashMap<String, ExecutionLog>,
}

#[derive(Default)]
struct LogState {
    task_logs: HashMap<String, Vec<TaskLogEntry>>,
    execution_logs: HashMap<String, ExecutionLog>,
}

impl LogState {
    /// Drops execution logs no task entry links to anymore.
    fn drop_orphans(&mut self) -> usize {
        let linked: HashSet<&str> = self
            .task_logs
            .values()
            .flatten()
            .filter_map(|e| e.execution_log_id.as_deref())
            .collect();
        let before = self.execution_logs.len();
        self.execution_logs
            .retain(|id, _| linked.contains(id.as_str()));
        before - self.execution_logs.len()
    }
}

/// Per-task log history and per-run execution logs behind a single lock.
pub struct LogStore {
    state: RwLock<LogState>,
    history_limit: usize,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl LogStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            state: RwLock::new(LogState::default()),
            history_limit: history_limit.max(1),
        }
    }

    /// Appends an entry. History beyond the limit is dropped oldest first,
    /// together with the execution logs it pointed at.
    pub fn append(&self, task_id: &str, entry: TaskLogEntry) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.push_entry(&mut state, task_id, entry);
    }

    /// Stores a run's execution log and the entry linking to it atomically.
    pub fn record_run(&self, task_id: &str, entry: TaskLogEntry, execution: ExecutionLog) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state
            .execution_logs
            .insert(execution.task_log_id.clone(), execution);
        self.push_entry(&mut state, task_id, entry);
    }

    fn push_entry(&self, state: &mut LogState, task_id: &str, entry: TaskLogEntry) {
        let entries = state.task_logs.entry(task_id.to_string()).or_default();
        entries.push(entry);
        if entries.len() > self.history_limit {
            let excess = entries.len() - self.history_limit;
            let dropped: Vec<TaskLogEntry> = entries.drain(..excess).collect();
            for id in dropped.iter().filter_map(|e| e.execution_log_id.as_deref()) {
                state.execution_logs.remove(id);
            }
        }
    }

    /// Newest first.
    pub fn task_logs(&self, task_id: &str) -> Vec<TaskLogEntry> {
        let mut entries = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            state.task_logs.get(task_id).cloned().unwrap_or_default()
        };
        entries.reverse();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    /// The run's attempts are returned newest first.
    pub fn execution_log(&self, log_id: &str) -> Option<ExecutionLog> {
        let mut log = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            state.execution_logs.get(log_id).cloned()?
        };
        log.detailed_logs.reverse();
        log.detailed_logs
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Some(log)
    }

    /// Returns false when the task had no logs.
    pub fn clear_task(&self, task_id: &str) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = state.task_logs.remove(task_id) else {
            return false;
        };
        for id in entries.iter().filter_map(|e| e.execution_log_id.as_deref()) {
            state.execution_logs.remove(id);
        }
        true
    }

    pub fn clear_all(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.task_logs.clear();
        state.execution_logs.clear();
    }

    /// Removes entries stamped before `cutoff` and the execution logs left
    /// without an entry. Entries with unparseable timestamps are kept.
    pub fn prune_older_than(&self, cutoff: NaiveDateTime) -> usize {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        for entries in state.task_logs.values_mut() {
            let before = entries.len();
            entries.retain(|e| match clock::parse_display(&e.timestamp) {
                Some(ts) => ts >= cutoff,
                None => true,
            });
            removed += before - entries.len();
        }
        state.task_logs.retain(|_, entries| !entries.is_empty());
        state.drop_orphans();
        removed
    }

    pub fn snapshot(&self) -> LogSnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        LogSnapshot {
            task_logs: state.task_logs.clone(),
            execution_logs: state.execution_logs.clone(),
        }
    }

    pub fn restore(&self, snapshot: LogSnapshot) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.task_logs = snapshot.task_logs;
        state.execution_logs = snapshot.execution_logs;
        state.drop_orphans();
    }
}
