//! Task drafts and polling helpers shared by the suites

use super::constants::*;
use http_task_runner::engine::Engine;
use http_task_runner::task::TaskDraft;
use serde_json::{json, Value};
use std::time::Duration;

/// JSON body for a single-request GET task
pub fn task_json(name: &str, url: &str) -> Value {
    json!({
        "name": name,
        "url": url,
        "method": "GET",
        "times": 1,
        "threads": 1,
    })
}

/// Engine-level draft for a GET task
pub fn draft(name: &str, url: &str, times: u32, threads: u32) -> TaskDraft {
    TaskDraft {
        name: name.to_string(),
        url: url.to_string(),
        method: "GET".to_string(),
        times,
        threads,
        ..Default::default()
    }
}

/// Waits until the engine reports the task as idle
pub async fn wait_idle(engine: &Engine, task_id: &str) {
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(RUN_TIMEOUT_MS);
    while start.elapsed() < timeout {
        if !engine.progress(task_id).is_running {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Task {} still running after {:?}", task_id, timeout);
}

/// Waits until `check` holds, polling every few milliseconds
pub async fn wait_for<F>(what: &str, mut check: F)
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(RUN_TIMEOUT_MS);
    while start.elapsed() < timeout {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Timed out waiting for {}", what);
}
