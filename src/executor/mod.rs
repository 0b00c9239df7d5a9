//! Sends one HTTP attempt per variant and judges the response.

mod http;
mod probe;
mod request;

pub use http::HttpRequestExecutor;
pub use probe::{is_sensitive_header, mask_header_value, ProbeResult};
pub use request::{infer_content_type, FORM_CONTENT_TYPE, JSON_CONTENT_TYPE};

use crate::logs::DetailedLogEntry;
use crate::variables::TaskVariant;
use async_trait::async_trait;

/// Result of one attempt. Failures are data, never errors.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub success: bool,
    pub entry: DetailedLogEntry,
}

impl Attempt {
    pub fn failed(entry: DetailedLogEntry) -> Self {
        Self {
            success: false,
            entry,
        }
    }
}

#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn execute(&self, variant: &TaskVariant) -> Attempt;
}
