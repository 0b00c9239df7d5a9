//! Success conditions and the evaluator that applies them to responses.

mod condition;
mod describe;
mod evaluate;

pub use condition::{
    ConditionDetail, ConditionKind, ConditionOperator, ErrorType, SuccessCondition,
};
pub use describe::{classify_failure, describe_condition_failure, describe_http_error};
pub use evaluate::{
    clean_response_body, evaluate, is_success_status, lookup_json_path, strip_bom,
    truncate_chars, Evaluation, MAX_ACTUAL_VALUE_CHARS,
};
