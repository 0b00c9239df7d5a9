use crate::evaluator::SuccessCondition;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Outcome of the most recent run of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
    Partial,
    Running,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Partial => "partial",
            RunStatus::Running => "running",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(RunStatus::Success),
            "failed" => Some(RunStatus::Failed),
            "partial" => Some(RunStatus::Partial),
            "running" => Some(RunStatus::Running),
            _ => None,
        }
    }

    /// Status of a finished run given how many of its attempts succeeded.
    pub fn from_counts(success_count: usize, total: usize) -> Self {
        if success_count == 0 {
            RunStatus::Failed
        } else if success_count == total {
            RunStatus::Success
        } else {
            RunStatus::Partial
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored request template plus its mutable run state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub headers_text: String,
    #[serde(default, rename = "data")]
    pub body: String,
    pub times: u32,
    pub threads: u32,
    /// Inclusive lower bound of the inter-request delay, in milliseconds.
    #[serde(default)]
    pub delay_min: u64,
    /// Exclusive upper bound of the inter-request delay, in milliseconds.
    #[serde(default)]
    pub delay_max: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub cron_expr: Option<String>,
    #[serde(default)]
    pub success_condition: SuccessCondition,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub last_run_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_run_status")]
    pub last_run_status: Option<RunStatus>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub last_run_result: Option<String>,
}

impl Task {
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            last_run_time: self.last_run_time.clone(),
            last_run_status: self.last_run_status,
            last_run_result: self.last_run_result.clone(),
        }
    }
}

/// Condensed view of a task's identity and last run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: String,
    pub name: String,
    pub last_run_time: Option<String>,
    pub last_run_status: Option<RunStatus>,
    pub last_run_result: Option<String>,
}

/// One page of tasks ordered by creation time, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

// Legacy task files store "no value" as an empty string.
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn lenient_run_status<'de, D>(deserializer: D) -> Result<Option<RunStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(RunStatus::parse))
}
