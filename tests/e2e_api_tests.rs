//! End-to-end tests for the HTTP API
//!
//! Exercises every route over a real socket, including status mapping and the
//! JSON shapes clients depend on.

mod common;

use common::{task_json, TargetServer, TestClient, TestServer};
use reqwest::StatusCode;
use serde_json::{json, Value};

// =============================================================================
// Task CRUD
// =============================================================================

#[tokio::test]
async fn test_create_get_update_delete_task() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .create_task(&json!({
            "name": "ping",
            "url": "http://localhost/ping",
            "method": "post",
            "headersText": "X-A: 1\nX-B: 2",
            "data": "{}",
            "times": 3,
            "threads": 2,
            "tags": ["smoke"],
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("task_"));
    assert_eq!(created["method"], "POST");
    assert_eq!(created["headers"]["X-B"], "2");
    assert_eq!(created["isRunning"], false);

    let fetched: Value = client.get_task(&id).await.json().await.unwrap();
    assert_eq!(fetched["name"], "ping");
    assert_eq!(fetched["times"], 3);

    let summary: Value = client.get_task_summary(&id).await.json().await.unwrap();
    assert_eq!(summary["id"], id.as_str());
    assert_eq!(summary["name"], "ping");
    assert!(summary["lastRunStatus"].is_null());
    assert!(summary.get("times").is_none());

    let response = client
        .update_task(&id, &task_json("renamed", "http://localhost/other"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["id"], id.as_str());
    assert_eq!(updated["name"], "renamed");
    assert_eq!(updated["createdAt"], created["createdAt"]);

    assert_eq!(client.delete_task(&id).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(client.get_task(&id).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(client.get_task_summary(&id).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(client.delete_task(&id).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_drafts_are_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let cases = [
        json!({"name": "", "url": "http://h/", "times": 1}),
        json!({"name": "n", "url": "  ", "times": 1}),
        json!({"name": "n", "url": "http://h/", "times": 0}),
        json!({"name": "n", "url": "http://h/", "times": 1, "cronExpr": "bogus"}),
    ];
    for draft in cases {
        let response = client.create_task(&draft).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", draft);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    let listed: Value = client.list_tasks(1, 10).await.json().await.unwrap();
    assert_eq!(listed["total"], 0);
}

#[tokio::test]
async fn test_task_list_is_paginated() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    for i in 0..5 {
        client
            .create_task_id(&task_json(&format!("t{}", i), "http://h/"))
            .await;
    }

    let page: Value = client.list_tasks(2, 2).await.json().await.unwrap();
    assert_eq!(page["total"], 5);
    assert_eq!(page["page"], 2);
    assert_eq!(page["pageSize"], 2);
    assert_eq!(page["tasks"].as_array().unwrap().len(), 2);

    let last: Value = client.list_tasks(3, 2).await.json().await.unwrap();
    assert_eq!(last["tasks"].as_array().unwrap().len(), 1);
}

// =============================================================================
// Runs
// =============================================================================

#[tokio::test]
async fn test_run_progress_and_logs() {
    let target = TargetServer::spawn().await;
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let mut draft = task_json("runner", &target.url("/ok"));
    draft["times"] = json!(4);
    draft["threads"] = json!(2);
    let id = client.create_task_id(&draft).await;

    let response = client.run_task(&id).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let started: Value = response.json().await.unwrap();
    assert_eq!(started["taskId"], id.as_str());

    client.wait_until_idle(&id).await;
    assert_eq!(target.hit_count(), 4);

    let progress: Value = client.progress(&id).await.json().await.unwrap();
    assert_eq!(progress["isRunning"], false);

    let logs: Value = client.task_logs(&id).await.json().await.unwrap();
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["type"], "execution");
    assert_eq!(logs[0]["status"], "success");

    let log_id = logs[0]["executionLogId"].as_str().unwrap();
    let execution: Value = client.execution_log(log_id).await.json().await.unwrap();
    assert_eq!(execution["totalRequests"], 4);
    assert_eq!(execution["successCount"], 4);
    assert_eq!(execution["detailedLogs"].as_array().unwrap().len(), 4);
    assert_eq!(execution["detailedLogs"][0]["statusCode"], 200);

    assert_eq!(
        client.execution_log("nope").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_run_conflicts_and_stop() {
    let target = TargetServer::spawn().await;
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let mut draft = task_json("slow", &target.url("/slow?ms=200"));
    draft["times"] = json!(10);
    let id = client.create_task_id(&draft).await;

    assert_eq!(client.stop_task(&id).await.status(), StatusCode::CONFLICT);
    assert_eq!(client.run_task(&id).await.status(), StatusCode::ACCEPTED);

    let response = client.run_task(&id).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "task 'slow' is already running");

    let progress: Value = client.progress(&id).await.json().await.unwrap();
    assert_eq!(progress["isRunning"], true);
    assert_eq!(progress["total"], 10);

    assert_eq!(client.stop_task(&id).await.status(), StatusCode::NO_CONTENT);
    let task: Value = client.get_task(&id).await.json().await.unwrap();
    assert_eq!(task["isRunning"], false);

    assert_eq!(client.run_task("missing").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_probe_saved_and_unsaved_task() {
    let target = TargetServer::spawn().await;
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let id = client.create_task_id(&task_json("probe", &target.url("/json"))).await;
    let probe: Value = client.test_task(&id).await.json().await.unwrap();
    assert_eq!(probe["success"], true);
    assert_eq!(probe["statusCode"], 200);
    assert_eq!(probe["requestMethod"], "GET");
    assert!(probe["responseBody"].as_str().unwrap().contains("\"status\":\"ok\""));

    let mut draft = task_json("unsaved", &target.url("/status/404"));
    draft["headersText"] =
        json!("X-Api-Key: short\nX-Auth-Token: abcdefghijklmnopqrstuvwxyz\nCookie: sid=1");
    let probe: Value = client.test_draft(&draft).await.json().await.unwrap();
    assert_eq!(probe["success"], false);
    assert_eq!(probe["statusCode"], 404);
    assert_eq!(probe["requestHeaders"]["X-Api-Key"], "short");
    assert_eq!(probe["requestHeaders"]["X-Auth-Token"], "abcdefghij***tuvwxyz");
    assert_eq!(probe["requestHeaders"]["Cookie"], "***");
    let sensitive = probe["sensitiveHeaders"].as_array().unwrap();
    assert_eq!(sensitive.len(), 2);

    let response = client.test_draft(&json!({"name": "n", "url": ""})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Variables and preview
// =============================================================================

#[tokio::test]
async fn test_variables_and_preview() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.put_variable("HOST", &json!("example.com")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = client
        .put_variable("IDS", &json!({"value": "1;2", "separators": [";"]}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = client
        .put_variable("LEGACY", &json!({"value": "a|b", "separator": "|"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let vars: Value = client.list_variables().await.json().await.unwrap();
    assert_eq!(vars["HOST"]["value"], "example.com");
    assert_eq!(vars["IDS"]["separators"], json!([";"]));
    assert_eq!(vars["LEGACY"]["separators"], json!(["|"]));

    let mut draft = task_json("preview", "https://{{HOST}}/items/{{IDS}}");
    draft["data"] = json!("host={{HOST}}&missing={{NOPE}}");
    let id = client.create_task_id(&draft).await;

    let preview: Value = client.preview_task(&id).await.json().await.unwrap();
    assert_eq!(preview["url"], "https://example.com/items/1;2");
    assert_eq!(preview["data"], "host=example.com&missing={{NOPE}}");

    assert_eq!(
        client.put_variable_raw("BROKEN", "{not json").await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        client.delete_variable("HOST").await.status(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        client.delete_variable("HOST").await.status(),
        StatusCode::NOT_FOUND
    );
}

// =============================================================================
// Scheduling and cron
// =============================================================================

#[tokio::test]
async fn test_schedule_routes() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let plain = client.create_task_id(&task_json("plain", "http://h/")).await;
    assert_eq!(
        client.schedule_task(&plain).await.status(),
        StatusCode::BAD_REQUEST
    );

    let mut draft = task_json("cron", "http://h/");
    draft["cronExpr"] = json!("*/5 * * * *");
    let id = client.create_task_id(&draft).await;

    let info: Value = client.schedule_task(&id).await.json().await.unwrap();
    assert_eq!(info["isScheduled"], true);
    assert_eq!(info["status"], "scheduled");
    assert_eq!(info["cronExpr"], "*/5 * * * *");

    let schedules: Value = client.list_schedules().await.json().await.unwrap();
    assert_eq!(schedules["taskIds"], json!([id.clone()]));

    assert_eq!(
        client.unschedule_task(&id).await.status(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        client.unschedule_task(&id).await.status(),
        StatusCode::CONFLICT
    );
    let info: Value = client.schedule_info(&id).await.json().await.unwrap();
    assert_eq!(info["isScheduled"], false);
}

#[tokio::test]
async fn test_describe_cron() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.describe_cron("* * * * *").await;
    assert_eq!(response.status(), StatusCode::OK);
    let preview: Value = response.json().await.unwrap();
    assert_eq!(preview["cronExpr"], "* * * * *");
    assert_eq!(preview["description"], "every minute");
    assert!(!preview["nextRunTime"].as_str().unwrap().is_empty());

    let response = client.describe_cron("1 2 3").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("expected 5 or 6 fields, got 3"));
}

// =============================================================================
// Logs and metrics
// =============================================================================

#[tokio::test]
async fn test_clear_logs() {
    let target = TargetServer::spawn().await;
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let a = client.create_task_id(&task_json("a", &target.url("/ok"))).await;
    let b = client.create_task_id(&task_json("b", &target.url("/ok"))).await;
    for id in [&a, &b] {
        client.run_task(id).await;
        client.wait_until_idle(id).await;
    }

    assert_eq!(client.clear_task_logs(&a).await.status(), StatusCode::NO_CONTENT);
    let logs: Value = client.task_logs(&a).await.json().await.unwrap();
    assert!(logs.as_array().unwrap().is_empty());
    let logs: Value = client.task_logs(&b).await.json().await.unwrap();
    assert_eq!(logs.as_array().unwrap().len(), 1);

    assert_eq!(client.clear_all_logs().await.status(), StatusCode::NO_CONTENT);
    let logs: Value = client.task_logs(&b).await.json().await.unwrap();
    assert!(logs.as_array().unwrap().is_empty());

    assert_eq!(
        client.task_logs("missing").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_metrics_endpoint() {
    http_task_runner::metrics::init_metrics();
    let target = TargetServer::spawn().await;
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let id = client.create_task_id(&task_json("m", &target.url("/ok"))).await;
    client.run_task(&id).await;
    client.wait_until_idle(&id).await;

    let response = client.metrics().await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = response.text().await.unwrap();
    assert!(text.contains("http_task_runner_attempts_total"));
    assert!(text.contains("http_task_runner_runs_total"));
}
