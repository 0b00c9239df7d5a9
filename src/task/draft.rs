use super::headers::parse_headers_text;
use super::models::Task;
use crate::evaluator::SuccessCondition;
use crate::scheduler::{CronError, CronSpec};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("task name must not be empty")]
    EmptyName,
    #[error("task URL must not be empty")]
    EmptyUrl,
    #[error("repetition count must be greater than zero")]
    ZeroTimes,
    #[error(transparent)]
    Cron(#[from] CronError),
}

/// User-supplied fields of a task, before it gets an id and run state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDraft {
    pub name: String,
    pub url: String,
    pub method: String,
    pub headers_text: String,
    #[serde(rename = "data")]
    pub body: String,
    pub times: u32,
    pub threads: u32,
    pub delay_min: u64,
    pub delay_max: u64,
    pub tags: Vec<String>,
    pub cron_expr: Option<String>,
    pub success_condition: SuccessCondition,
}

impl TaskDraft {
    /// Checks the fields a run cannot start without.
    pub fn validate(&self) -> Result<(), DraftError> {
        self.validate_request()?;
        if self.times == 0 {
            return Err(DraftError::ZeroTimes);
        }
        if let Some(expr) = self.cron_expr() {
            CronSpec::parse(expr)?;
        }
        Ok(())
    }

    /// Checks only what a single probe request needs.
    pub fn validate_request(&self) -> Result<(), DraftError> {
        if self.name.trim().is_empty() {
            return Err(DraftError::EmptyName);
        }
        if self.url.trim().is_empty() {
            return Err(DraftError::EmptyUrl);
        }
        Ok(())
    }

    pub fn cron_expr(&self) -> Option<&str> {
        self.cron_expr
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn normalized_method(&self) -> String {
        let method = self.method.trim();
        if method.is_empty() {
            "GET".to_string()
        } else {
            method.to_uppercase()
        }
    }

    /// Builds a fresh task. Callers are expected to have validated the draft.
    pub fn into_task(self, now: i64) -> Task {
        let id = format!("task_{}", Uuid::new_v4().simple());
        let mut task = Task {
            id,
            name: String::new(),
            url: String::new(),
            method: String::new(),
            headers: Default::default(),
            headers_text: String::new(),
            body: String::new(),
            times: 0,
            threads: 0,
            delay_min: 0,
            delay_max: 0,
            tags: Vec::new(),
            cron_expr: None,
            success_condition: SuccessCondition::default(),
            created_at: now,
            updated_at: now,
            is_running: false,
            last_run_time: None,
            last_run_status: None,
            last_run_result: None,
        };
        self.apply_to(&mut task, now);
        task
    }

    /// Overwrites the template fields of `task`, leaving id and run state alone.
    pub fn apply_to(self, task: &mut Task, now: i64) {
        task.method = self.normalized_method();
        task.cron_expr = self.cron_expr().map(str::to_string);
        task.headers = parse_headers_text(&self.headers_text);
        task.name = self.name.trim().to_string();
        task.url = self.url.trim().to_string();
        task.headers_text = self.headers_text;
        task.body = self.body;
        task.times = self.times;
        task.threads = self.threads;
        task.delay_min = self.delay_min;
        task.delay_max = self.delay_max;
        task.tags = self.tags;
        task.success_condition = self.success_condition;
        task.updated_at = now;
    }
}
