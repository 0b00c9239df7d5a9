use axum::extract::FromRef;

use crate::engine::Engine;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedEngine = Arc<Engine>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub engine: GuardedEngine,
}

impl ServerState {
    pub fn new(config: ServerConfig, engine: GuardedEngine) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            engine,
        }
    }
}

impl FromRef<ServerState> for GuardedEngine {
    fn from_ref(input: &ServerState) -> Self {
        input.engine.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
