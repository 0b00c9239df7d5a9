use crate::evaluator::{ConditionDetail, ErrorType};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Execution,
    Schedule,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Failed,
    Partial,
    Skipped,
    #[serde(other)]
    Info,
}

impl From<crate::task::RunStatus> for LogStatus {
    fn from(status: crate::task::RunStatus) -> Self {
        use crate::task::RunStatus;
        match status {
            RunStatus::Success => LogStatus::Success,
            RunStatus::Failed => LogStatus::Failed,
            RunStatus::Partial => LogStatus::Partial,
            RunStatus::Running => LogStatus::Info,
        }
    }
}

/// Short task-scoped audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLogEntry {
    pub id: String,
    pub timestamp: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub status: LogStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_log_id: Option<String>,
}

/// One HTTP attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedLogEntry {
    pub request_id: String,
    pub timestamp: String,
    pub url: String,
    pub method: String,
    /// Zero when no response was received.
    pub status_code: u16,
    /// Milliseconds.
    pub response_time: u64,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub error: String,
    pub success: bool,
    #[serde(default)]
    pub success_condition_details: Option<ConditionDetail>,
    #[serde(default, deserialize_with = "lenient_error_type")]
    pub error_type: Option<ErrorType>,
    #[serde(default)]
    pub detailed_error: String,
}

/// Every attempt of one run plus its totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub task_log_id: String,
    pub detailed_logs: Vec<DetailedLogEntry>,
    pub summary: String,
    pub total_requests: usize,
    pub success_count: usize,
    pub failed_count: usize,
    /// Seconds.
    pub duration: u64,
}

fn lenient_error_type<'de, D>(deserializer: D) -> Result<Option<ErrorType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(match value.as_deref() {
        Some("network") => Some(ErrorType::Network),
        Some("parsing") => Some(ErrorType::Parsing),
        Some("condition") => Some(ErrorType::Condition),
        Some("http") => Some(ErrorType::Http),
        _ => None,
    })
}
