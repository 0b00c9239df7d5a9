use super::request::{prepare, PreparedRequest};
use super::{Attempt, RequestSender};
use crate::clock;
use crate::config::ExecutorSettings;
use crate::evaluator::{
    classify_failure, describe_condition_failure, describe_http_error, evaluate, strip_bom,
    ErrorType,
};
use crate::logs::DetailedLogEntry;
use crate::variables::TaskVariant;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{redirect, Client, Response};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Sends task variants over HTTP with one shared connection pool.
pub struct HttpRequestExecutor {
    pub(super) client: Client,
    /// Same limits as `client` but never follows redirects.
    pub(super) probe_client: Client,
    pub(super) settings: ExecutorSettings,
}

impl HttpRequestExecutor {
    pub fn new(settings: &ExecutorSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;
        let probe_client = Client::builder()
            .timeout(settings.request_timeout)
            .redirect(redirect::Policy::none())
            .build()
            .context("Failed to create probe HTTP client")?;
        Ok(Self {
            client,
            probe_client,
            settings: settings.clone(),
        })
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }
}

#[async_trait]
impl RequestSender for HttpRequestExecutor {
    async fn execute(&self, variant: &TaskVariant) -> Attempt {
        let mut entry = DetailedLogEntry {
            request_id: format!("req_{}", Uuid::new_v4().simple()),
            timestamp: clock::display_now(),
            url: variant.url.clone(),
            method: variant.method.clone(),
            status_code: 0,
            response_time: 0,
            response: String::new(),
            error: String::new(),
            success: false,
            success_condition_details: None,
            error_type: None,
            detailed_error: String::new(),
        };

        let start = Instant::now();
        let PreparedRequest {
            builder, method, ..
        } = match prepare(&self.client, variant) {
            Ok(prepared) => prepared,
            Err(message) => {
                entry.detailed_error = format!("Could not build the request: {}", message);
                entry.error = message;
                entry.error_type = Some(ErrorType::Network);
                return Attempt::failed(entry);
            }
        };
        entry.method = method.to_string();

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                entry.response_time = elapsed_ms(start);
                entry.error = transport_error(&e, self.settings.request_timeout);
                entry.detailed_error = format!(
                    "Network error: {}. Check that the URL is reachable and the server is running.",
                    entry.error
                );
                entry.error_type = Some(ErrorType::Network);
                debug!("Request to {} failed: {}", variant.url, entry.error);
                return Attempt::failed(entry);
            }
        };

        let status = response.status().as_u16();
        entry.status_code = status;

        let body = match read_limited(response, self.settings.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                entry.response_time = elapsed_ms(start);
                entry.error = format!("failed to read response body: {}", e);
                entry.detailed_error = format!(
                    "The server answered with HTTP {} but the body could not be read: {}",
                    status, e
                );
                entry.error_type = Some(ErrorType::Parsing);
                return Attempt::failed(entry);
            }
        };
        entry.response_time = elapsed_ms(start);
        entry.response = String::from_utf8_lossy(strip_bom(&body)).into_owned();

        let evaluation = evaluate(&variant.success_condition, status, &entry.response);
        entry.success = evaluation.verdict;
        match classify_failure(&evaluation) {
            None => {}
            Some(ErrorType::Http) => {
                entry.error = format!("HTTP {}", status);
                entry.detailed_error = describe_http_error(status);
                entry.error_type = Some(ErrorType::Http);
            }
            Some(kind) => {
                entry.error = "success condition not met".to_string();
                entry.detailed_error = describe_condition_failure(&evaluation.detail);
                entry.error_type = Some(kind);
            }
        }
        entry.success_condition_details = Some(evaluation.detail);

        Attempt {
            success: entry.success,
            entry,
        }
    }
}

/// Reads at most `limit` bytes of the body and drops the rest.
pub(super) async fn read_limited(mut response: Response, limit: usize) -> reqwest::Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit.saturating_sub(body.len());
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

pub(super) fn transport_error(error: &reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        format!("request timed out after {}s", timeout.as_secs())
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        format!("request failed: {}", error)
    }
}

pub(super) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
