//! Shared constants for end-to-end tests

/// Timeout for API requests made by the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// How long to wait for a spawned server to accept connections
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// How long to wait for a background run to finish
pub const RUN_TIMEOUT_MS: u64 = 10_000;

/// Body served by the target's `/json` route
pub const JSON_BODY: &str = r#"{"code":0,"data":{"status":"ok","items":[1,2]}}"#;
