use super::condition::{ConditionDetail, ConditionKind, ConditionOperator, SuccessCondition};
use serde_json::Value;

/// Longest actual value kept in a [`ConditionDetail`].
pub const MAX_ACTUAL_VALUE_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub verdict: bool,
    pub detail: ConditionDetail,
}

/// Decides whether a response satisfies `condition`.
pub fn evaluate(condition: &SuccessCondition, status: u16, body: &str) -> Evaluation {
    let string_based = condition.operator.is_string_based();
    let mut detail = ConditionDetail {
        kind: if string_based {
            ConditionKind::StringBased
        } else {
            ConditionKind::JsonPath
        },
        json_path: if string_based {
            String::new()
        } else {
            condition.json_path.clone()
        },
        operator: condition.operator.to_string(),
        expected_value: condition.expected_value.clone(),
        actual_value: String::new(),
        result: false,
        reason: String::new(),
    };

    if !condition.enabled {
        return status_check(
            detail,
            status,
            "default status check: custom success condition is disabled",
        );
    }

    if string_based {
        return evaluate_body_text(condition, body, detail);
    }

    if condition.json_path.is_empty() {
        return status_check(detail, status, "default status check: no JSON path set");
    }

    if body.is_empty() {
        detail.reason = "empty body: nothing to evaluate the JSON path against".to_string();
        return finish(detail, false);
    }

    let cleaned = clean_response_body(body);
    let parsed: Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(e) => {
            detail.actual_value = "JSON parse failed".to_string();
            detail.reason = format!("JSON parse error: {}", e);
            return finish(detail, false);
        }
    };

    let Some(value) = lookup_json_path(&parsed, &condition.json_path) else {
        detail.actual_value = "null".to_string();
        detail.reason = format!("path {} resolves to null", condition.json_path);
        return finish(detail, false);
    };

    let actual = stringify(value);
    let verdict = compare(&actual, &condition.operator, &condition.expected_value);
    detail.reason = match &condition.operator {
        ConditionOperator::Equals
        | ConditionOperator::NotEquals
        | ConditionOperator::Contains
        | ConditionOperator::NotContains => format!(
            "checked whether '{}' {} '{}'",
            actual,
            condition.operator.describe(),
            condition.expected_value
        ),
        other => format!(
            "unknown operator '{}', compared '{}' and '{}' for equality",
            other, actual, condition.expected_value
        ),
    };
    detail.actual_value = truncate_chars(&actual, MAX_ACTUAL_VALUE_CHARS);
    finish(detail, verdict)
}

fn status_check(mut detail: ConditionDetail, status: u16, reason: &str) -> Evaluation {
    detail.kind = ConditionKind::HttpStatus;
    detail.actual_value = status.to_string();
    detail.reason = reason.to_string();
    finish(detail, is_success_status(status))
}

fn evaluate_body_text(
    condition: &SuccessCondition,
    body: &str,
    mut detail: ConditionDetail,
) -> Evaluation {
    let cleaned = clean_response_body(body);
    let expected = condition.expected_value.as_str();
    let length_note = format!("response body length: {} characters", cleaned.chars().count());

    let verdict = match condition.operator {
        ConditionOperator::ResponseContains => {
            detail.actual_value = length_note;
            detail.reason = format!("checked whether the response body contains '{}'", expected);
            cleaned.contains(expected)
        }
        ConditionOperator::ResponseNotContains => {
            detail.actual_value = length_note;
            detail.reason = format!(
                "checked whether the response body does not contain '{}'",
                expected
            );
            !cleaned.contains(expected)
        }
        ConditionOperator::ResponseEquals => {
            detail.actual_value = truncate_chars(cleaned, MAX_ACTUAL_VALUE_CHARS);
            detail.reason = "checked whether the response body equals the expected text".to_string();
            cleaned == expected
        }
        ConditionOperator::ResponseNotEquals => {
            detail.actual_value = truncate_chars(cleaned, MAX_ACTUAL_VALUE_CHARS);
            detail.reason =
                "checked whether the response body differs from the expected text".to_string();
            cleaned != expected
        }
        _ => false,
    };
    finish(detail, verdict)
}

fn finish(mut detail: ConditionDetail, verdict: bool) -> Evaluation {
    detail.result = verdict;
    Evaluation { verdict, detail }
}

pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Walks a dotted path through nested objects. Any other shape on the way,
/// a missing key, or a JSON null at the end yields `None`.
pub fn lookup_json_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |current, key| match current {
            Value::Object(map) => map.get(key),
            _ => None,
        })
        .filter(|value| !value.is_null())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(actual: &str, operator: &ConditionOperator, expected: &str) -> bool {
    match operator {
        ConditionOperator::NotEquals => actual != expected,
        ConditionOperator::Contains => actual.contains(expected),
        ConditionOperator::NotContains => !actual.contains(expected),
        _ => actual == expected,
    }
}

const BOM: char = '\u{feff}';

/// Strips a UTF-8 or UTF-16 byte order mark from raw body bytes.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return rest;
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return rest;
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return rest;
    }
    bytes
}

/// Removes a leading BOM, surrounding whitespace and stray control characters.
/// Newlines and tabs inside the text are kept.
pub fn clean_response_body(body: &str) -> &str {
    body.trim_start_matches(BOM).trim_matches(|c: char| {
        c.is_whitespace() || (c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    })
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
