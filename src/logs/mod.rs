//! Task log history, per-run execution logs and their retention.

mod models;
mod retention;
mod store;

pub use models::{DetailedLogEntry, ExecutionLog, LogKind, LogStatus, TaskLogEntry};
pub use retention::LogRetention;
pub use store::{LogSnapshot, LogStore, DEFAULT_HISTORY_LIMIT};

use crate::clock;

/// Builds a task log entry stamped with the current time. Execution entries
/// link to an execution log sharing their id.
pub fn new_entry(task_id: &str, kind: LogKind, status: LogStatus, message: String) -> TaskLogEntry {
    let id = format!("{}_{}", task_id, clock::unix_nanos());
    TaskLogEntry {
        execution_log_id: (kind == LogKind::Execution).then(|| id.clone()),
        id,
        timestamp: clock::display_now(),
        message,
        kind,
        status,
    }
}
