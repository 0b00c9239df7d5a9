//! Task definitions and the task store.

mod draft;
mod headers;
mod models;
mod store;

pub use draft::{DraftError, TaskDraft};
pub use headers::parse_headers_text;
pub use models::{RunStatus, Task, TaskPage, TaskSummary};
pub use store::TaskStore;
