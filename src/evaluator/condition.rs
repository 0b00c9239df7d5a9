use serde::{Deserialize, Serialize};

/// Comparison applied by a success condition. Operators that are not
/// recognized are kept as written and compare like [`ConditionOperator::Equals`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    #[default]
    Equals,
    NotEquals,
    Contains,
    NotContains,
    ResponseEquals,
    ResponseNotEquals,
    ResponseContains,
    ResponseNotContains,
    Other(String),
}

impl ConditionOperator {
    pub fn as_str(&self) -> &str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not_equals",
            ConditionOperator::Contains => "contains",
            ConditionOperator::NotContains => "not_contains",
            ConditionOperator::ResponseEquals => "response_equals",
            ConditionOperator::ResponseNotEquals => "response_not_equals",
            ConditionOperator::ResponseContains => "response_contains",
            ConditionOperator::ResponseNotContains => "response_not_contains",
            ConditionOperator::Other(s) => s,
        }
    }

    /// `response_*` operators compare the raw body text and ignore any JSON path.
    pub fn is_string_based(&self) -> bool {
        matches!(
            self,
            ConditionOperator::ResponseEquals
                | ConditionOperator::ResponseNotEquals
                | ConditionOperator::ResponseContains
                | ConditionOperator::ResponseNotContains
        )
    }

    pub fn describe(&self) -> &str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "does not equal",
            ConditionOperator::Contains => "contains",
            ConditionOperator::NotContains => "does not contain",
            ConditionOperator::ResponseEquals => "response equals",
            ConditionOperator::ResponseNotEquals => "response does not equal",
            ConditionOperator::ResponseContains => "response contains",
            ConditionOperator::ResponseNotContains => "response does not contain",
            ConditionOperator::Other(s) => s,
        }
    }
}

impl From<String> for ConditionOperator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "equals" => ConditionOperator::Equals,
            "not_equals" => ConditionOperator::NotEquals,
            "contains" => ConditionOperator::Contains,
            "not_contains" => ConditionOperator::NotContains,
            "response_equals" => ConditionOperator::ResponseEquals,
            "response_not_equals" => ConditionOperator::ResponseNotEquals,
            "response_contains" => ConditionOperator::ResponseContains,
            "response_not_contains" => ConditionOperator::ResponseNotContains,
            _ => ConditionOperator::Other(s),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(op: ConditionOperator) -> Self {
        match op {
            ConditionOperator::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate deciding whether one HTTP attempt counts as a success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuccessCondition {
    pub enabled: bool,
    pub json_path: String,
    pub operator: ConditionOperator,
    pub expected_value: String,
}

impl SuccessCondition {
    pub fn json_path(path: &str, operator: ConditionOperator, expected: &str) -> Self {
        Self {
            enabled: true,
            json_path: path.to_string(),
            operator,
            expected_value: expected.to_string(),
        }
    }

    pub fn body(operator: ConditionOperator, expected: &str) -> Self {
        Self {
            enabled: true,
            json_path: String::new(),
            operator,
            expected_value: expected.to_string(),
        }
    }
}

/// Which branch of the evaluator produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    HttpStatus,
    JsonPath,
    StringBased,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::HttpStatus => "http_status",
            ConditionKind::JsonPath => "json_path",
            ConditionKind::StringBased => "string_based",
        }
    }
}

/// How a verdict was reached, kept with the attempt for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionDetail {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    #[serde(default)]
    pub json_path: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub expected_value: String,
    #[serde(default)]
    pub actual_value: String,
    pub result: bool,
    #[serde(default)]
    pub reason: String,
}

/// Why a failed attempt failed. Exactly one applies per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    /// The request could not be sent or the connection failed.
    Network,
    /// The response body could not be read.
    Parsing,
    /// A configured condition rejected the response.
    Condition,
    /// The default status check rejected the response.
    Http,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Network => "network",
            ErrorType::Parsing => "parsing",
            ErrorType::Condition => "condition",
            ErrorType::Http => "http",
        }
    }
}
