//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides methods for every API endpoint.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the API server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub async fn list_tasks(&self, page: usize, page_size: usize) -> Response {
        self.client
            .get(self.url(&format!("/tasks?page={}&page_size={}", page, page_size)))
            .send()
            .await
            .expect("List tasks request failed")
    }

    pub async fn create_task(&self, draft: &Value) -> Response {
        self.client
            .post(self.url("/tasks"))
            .json(draft)
            .send()
            .await
            .expect("Create task request failed")
    }

    /// Creates a task and returns its id, panicking on failure
    pub async fn create_task_id(&self, draft: &Value) -> String {
        let response = self.create_task(draft).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Task creation failed"
        );
        let task: Value = response.json().await.expect("Invalid task JSON");
        task["id"].as_str().expect("Task has no id").to_string()
    }

    pub async fn get_task(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/tasks/{}", id)))
            .send()
            .await
            .expect("Get task request failed")
    }

    pub async fn get_task_summary(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/tasks/{}/summary", id)))
            .send()
            .await
            .expect("Get task summary request failed")
    }

    pub async fn update_task(&self, id: &str, draft: &Value) -> Response {
        self.client
            .put(self.url(&format!("/tasks/{}", id)))
            .json(draft)
            .send()
            .await
            .expect("Update task request failed")
    }

    pub async fn delete_task(&self, id: &str) -> Response {
        self.client
            .delete(self.url(&format!("/tasks/{}", id)))
            .send()
            .await
            .expect("Delete task request failed")
    }

    pub async fn run_task(&self, id: &str) -> Response {
        self.client
            .post(self.url(&format!("/tasks/{}/run", id)))
            .send()
            .await
            .expect("Run task request failed")
    }

    pub async fn stop_task(&self, id: &str) -> Response {
        self.client
            .post(self.url(&format!("/tasks/{}/stop", id)))
            .send()
            .await
            .expect("Stop task request failed")
    }

    pub async fn progress(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/tasks/{}/progress", id)))
            .send()
            .await
            .expect("Progress request failed")
    }

    pub async fn test_task(&self, id: &str) -> Response {
        self.client
            .post(self.url(&format!("/tasks/{}/test", id)))
            .send()
            .await
            .expect("Test task request failed")
    }

    pub async fn test_draft(&self, draft: &Value) -> Response {
        self.client
            .post(self.url("/tasks/test"))
            .json(draft)
            .send()
            .await
            .expect("Test draft request failed")
    }

    pub async fn preview_task(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/tasks/{}/preview", id)))
            .send()
            .await
            .expect("Preview request failed")
    }

    /// Polls progress until the task is no longer running
    pub async fn wait_until_idle(&self, id: &str) {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(RUN_TIMEOUT_MS);
        while start.elapsed() < timeout {
            let progress: Value = self.progress(id).await.json().await.unwrap();
            if progress["isRunning"] == json!(false) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Task {} still running after {:?}", id, timeout);
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    pub async fn schedule_task(&self, id: &str) -> Response {
        self.client
            .post(self.url(&format!("/tasks/{}/schedule", id)))
            .send()
            .await
            .expect("Schedule request failed")
    }

    pub async fn unschedule_task(&self, id: &str) -> Response {
        self.client
            .delete(self.url(&format!("/tasks/{}/schedule", id)))
            .send()
            .await
            .expect("Unschedule request failed")
    }

    pub async fn schedule_info(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/tasks/{}/schedule", id)))
            .send()
            .await
            .expect("Schedule info request failed")
    }

    pub async fn list_schedules(&self) -> Response {
        self.client
            .get(self.url("/schedules"))
            .send()
            .await
            .expect("List schedules request failed")
    }

    pub async fn describe_cron(&self, expr: &str) -> Response {
        self.client
            .get(self.url("/cron/describe"))
            .query(&[("expr", expr)])
            .send()
            .await
            .expect("Describe cron request failed")
    }

    // ========================================================================
    // Variables
    // ========================================================================

    pub async fn list_variables(&self) -> Response {
        self.client
            .get(self.url("/variables"))
            .send()
            .await
            .expect("List variables request failed")
    }

    pub async fn put_variable(&self, name: &str, payload: &Value) -> Response {
        self.client
            .put(self.url(&format!("/variables/{}", name)))
            .json(payload)
            .send()
            .await
            .expect("Put variable request failed")
    }

    pub async fn put_variable_raw(&self, name: &str, body: &str) -> Response {
        self.client
            .put(self.url(&format!("/variables/{}", name)))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("Put variable request failed")
    }

    pub async fn delete_variable(&self, name: &str) -> Response {
        self.client
            .delete(self.url(&format!("/variables/{}", name)))
            .send()
            .await
            .expect("Delete variable request failed")
    }

    // ========================================================================
    // Logs
    // ========================================================================

    pub async fn task_logs(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/tasks/{}/logs", id)))
            .send()
            .await
            .expect("Task logs request failed")
    }

    pub async fn clear_task_logs(&self, id: &str) -> Response {
        self.client
            .delete(self.url(&format!("/tasks/{}/logs", id)))
            .send()
            .await
            .expect("Clear task logs request failed")
    }

    pub async fn clear_all_logs(&self) -> Response {
        self.client
            .delete(self.url("/logs"))
            .send()
            .await
            .expect("Clear logs request failed")
    }

    pub async fn execution_log(&self, log_id: &str) -> Response {
        self.client
            .get(self.url(&format!("/logs/{}", log_id)))
            .send()
            .await
            .expect("Execution log request failed")
    }

    pub async fn metrics(&self) -> Response {
        self.client
            .get(format!("{}/metrics", self.base_url))
            .send()
            .await
            .expect("Metrics request failed")
    }
}
