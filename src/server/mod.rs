pub mod config;
mod data_routes;
mod error;
mod http_layers;
#[allow(clippy::module_inception)]
pub mod server;
pub mod state;
mod task_routes;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use http_layers::*;
pub use server::{make_app, run_server};
