//! HTTP Task Runner Library
//!
//! Bulk HTTP request execution: templated tasks, variable expansion, worker
//! pools, cron scheduling and run logs, behind an axum API.

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod evaluator;
pub mod executor;
pub mod logs;
pub mod metrics;
pub mod persistence;
pub mod progress;
pub mod scheduler;
pub mod server;
pub mod task;
pub mod variables;

// Re-export commonly used types for convenience
pub use engine::{Engine, EngineError, EngineSettings};
pub use server::{make_app, run_server, RequestsLoggingLevel};
