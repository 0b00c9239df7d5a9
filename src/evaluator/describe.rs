use super::condition::{ConditionDetail, ConditionKind, ConditionOperator, ErrorType};
use super::evaluate::Evaluation;
use std::fmt::Write;

/// Error type of a response that was received but judged a failure.
pub fn classify_failure(evaluation: &Evaluation) -> Option<ErrorType> {
    if evaluation.verdict {
        return None;
    }
    match evaluation.detail.kind {
        ConditionKind::HttpStatus => Some(ErrorType::Http),
        ConditionKind::JsonPath | ConditionKind::StringBased => Some(ErrorType::Condition),
    }
}

/// Multi-line report of why a configured condition rejected a response.
pub fn describe_condition_failure(detail: &ConditionDetail) -> String {
    let mut out = String::from("Success condition details:\n");
    match detail.kind {
        ConditionKind::JsonPath => {
            out.push_str("- Condition type: JSON path\n");
            let _ = writeln!(out, "- JSON path: {}", detail.json_path);
        }
        ConditionKind::StringBased => out.push_str("- Condition type: response text\n"),
        ConditionKind::HttpStatus => out.push_str("- Condition type: HTTP status code\n"),
    }
    let operator = ConditionOperator::from(detail.operator.clone());
    let _ = writeln!(out, "- Operator: {}", operator.describe());
    let _ = writeln!(out, "- Expected: \"{}\"", detail.expected_value);
    let _ = writeln!(out, "- Actual: \"{}\"", detail.actual_value);
    let _ = write!(out, "- Reason: {}", detail.reason);
    out
}

/// Multi-line report explaining a non-2xx status code.
pub fn describe_http_error(status: u16) -> String {
    let (category, explanation) = match status {
        400 => (
            "client error",
            "bad request, check the URL, headers and body format",
        ),
        401 => ("client error", "unauthorized, check the credentials"),
        403 => ("client error", "forbidden, check the permissions"),
        404 => (
            "client error",
            "resource not found, check that the URL is correct",
        ),
        405 => ("client error", "method not allowed, check the HTTP method"),
        408 => ("client error", "request timeout, try again later"),
        429 => (
            "client error",
            "too many requests, lower the request rate",
        ),
        400..=499 => ("client error", "the request was rejected, check its parameters"),
        500 => ("server error", "internal server error, try again later"),
        502 => ("server error", "bad gateway, the server is temporarily unavailable"),
        503 => (
            "server error",
            "service unavailable, the server is overloaded or under maintenance",
        ),
        504 => ("server error", "gateway timeout, the upstream server did not respond"),
        500.. => ("server error", "the server failed, try again later"),
        300..=399 => (
            "redirect",
            "the request was redirected and the redirect was not followed",
        ),
        _ => (
            "unknown",
            "the status code is outside the success range (200-299)",
        ),
    };
    format!(
        "HTTP status error details:\n- Status code: {}\n- Category: {}\n- Explanation: {}",
        status, category, explanation
    )
}
