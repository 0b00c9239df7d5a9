//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TargetServer, TestClient, TestServer};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_run_task() {
//!     let target = TargetServer::spawn().await;
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let id = client.create_task_id(&task_json("ping", &target.url("/ok"))).await;
//!     assert_eq!(client.run_task(&id).await.status(), StatusCode::ACCEPTED);
//! }
//! ```

mod client;
mod constants;
mod fixtures;
mod server;
mod target;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use server::{memory_engine, open_engine, test_settings, TestServer};
#[allow(unused_imports)]
pub use target::{Hit, TargetServer};
