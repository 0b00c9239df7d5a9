use super::http::{elapsed_ms, read_limited, transport_error, HttpRequestExecutor};
use super::request::prepare;
use crate::evaluator::{
    classify_failure, describe_condition_failure, describe_http_error, evaluate, strip_bom,
    ConditionDetail, ErrorType,
};
use crate::variables::TaskVariant;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// Header names containing any of these are masked in probe output.
const SENSITIVE_HEADER_MARKERS: [&str; 3] = ["cookie", "authorization", "token"];

/// Outcome of a single diagnostic request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub success: bool,
    pub status_code: u16,
    pub status_text: String,
    /// Milliseconds.
    pub response_time: u64,
    pub request_headers: BTreeMap<String, String>,
    pub response_headers: BTreeMap<String, String>,
    pub response_body: String,
    pub error: String,
    pub request_url: String,
    pub request_method: String,
    pub request_body_size: usize,
    pub sensitive_headers: Vec<String>,
    pub success_condition_details: Option<ConditionDetail>,
}

impl HttpRequestExecutor {
    /// Sends one request without following redirects and reports everything
    /// about it, masking credentials in the echoed request headers.
    pub async fn probe(&self, variant: &TaskVariant) -> ProbeResult {
        let mut result = ProbeResult {
            request_url: variant.url.clone(),
            request_method: variant.method.clone(),
            request_body_size: variant.body.len(),
            ..Default::default()
        };

        let start = Instant::now();
        let prepared = match prepare(&self.probe_client, variant) {
            Ok(prepared) => prepared,
            Err(message) => {
                result.error = format!("Could not build the request: {}", message);
                return result;
            }
        };
        result.request_method = prepared.method.to_string();
        result.sensitive_headers = prepared
            .headers
            .keys()
            .filter(|k| is_sensitive_header(k))
            .cloned()
            .collect();
        result.request_headers = prepared
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), mask_header_value(k, v)))
            .collect();

        let response = match prepared.builder.send().await {
            Ok(response) => response,
            Err(e) => {
                result.response_time = elapsed_ms(start);
                result.error = transport_error(&e, self.settings.request_timeout);
                return result;
            }
        };

        let status = response.status();
        result.status_code = status.as_u16();
        result.status_text = status.to_string();
        result.response_headers = response
            .headers()
            .keys()
            .filter_map(|name| {
                let first = response.headers().get(name)?;
                Some((
                    name.as_str().to_string(),
                    String::from_utf8_lossy(first.as_bytes()).into_owned(),
                ))
            })
            .collect();

        let body = match read_limited(response, self.settings.probe_max_body_bytes).await {
            Ok(bytes) => String::from_utf8_lossy(strip_bom(&bytes)).into_owned(),
            Err(e) => {
                result.response_time = elapsed_ms(start);
                result.error = format!("failed to read response body: {}", e);
                return result;
            }
        };
        result.response_time = elapsed_ms(start);

        let evaluation = evaluate(&variant.success_condition, result.status_code, &body);
        result.success = evaluation.verdict;
        match classify_failure(&evaluation) {
            None => {}
            Some(ErrorType::Http) => {
                result.error = format!(
                    "HTTP {}\n{}",
                    result.status_code,
                    describe_http_error(result.status_code)
                )
            }
            Some(_) => {
                result.error = format!(
                    "success condition not met\n{}",
                    describe_condition_failure(&evaluation.detail)
                )
            }
        }
        result.success_condition_details = Some(evaluation.detail);
        result.response_body = truncate_body(&body, self.settings.probe_body_chars);
        result
    }
}

pub fn is_sensitive_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_HEADER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Values over 20 characters keep their first 10 and last 7 characters.
pub fn mask_header_value(name: &str, value: &str) -> String {
    if !is_sensitive_header(name) {
        return value.to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 20 {
        let head: String = chars[..10].iter().collect();
        let tail: String = chars[chars.len() - 7..].iter().collect();
        format!("{}***{}", head, tail)
    } else {
        "***".to_string()
    }
}

fn truncate_body(body: &str, max_chars: usize) -> String {
    let total = body.chars().count();
    if total <= max_chars {
        return body.to_string();
    }
    let kept: String = body.chars().take(max_chars).collect();
    format!(
        "{}\n\n... (content too long, truncated, total length: {} characters)",
        kept, total
    )
}
