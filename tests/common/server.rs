//! Engine and API server lifecycle management
//!
//! Each test gets an isolated engine with its own data directory.

use super::constants::*;
use http_task_runner::config::ExecutorSettings;
use http_task_runner::engine::{Engine, EngineSettings};
use http_task_runner::persistence::{InMemoryPersistence, JsonFileStore, Persistence};
use http_task_runner::server::{make_app, RequestsLoggingLevel, ServerConfig};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Settings with a short request timeout so failing targets don't stall tests
pub fn test_settings() -> EngineSettings {
    EngineSettings {
        executor: ExecutorSettings {
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Opens an engine over the JSON files in `dir`
pub fn open_engine(dir: &Path) -> Arc<Engine> {
    let persistence = Arc::new(JsonFileStore::new(dir).expect("Failed to open data dir"));
    Engine::open(persistence, test_settings(), CancellationToken::new())
        .expect("Failed to open engine")
}

/// Opens an engine over in-memory persistence
pub fn memory_engine() -> (Arc<Engine>, Arc<InMemoryPersistence>) {
    let persistence = Arc::new(InMemoryPersistence::new());
    let engine = Engine::open(
        persistence.clone() as Arc<dyn Persistence>,
        test_settings(),
        CancellationToken::new(),
    )
    .expect("Failed to open engine");
    (engine, persistence)
}

/// API server instance with an isolated data directory
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The engine behind the API, for direct assertions
    pub engine: Arc<Engine>,

    // Private fields - keep resources alive until drop
    _data_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new API server on a random port
    pub async fn spawn() -> Self {
        let data_dir = TempDir::new().expect("Failed to create data dir");
        let engine = open_engine(data_dir.path());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            bind_address: "127.0.0.1".to_string(),
            port,
        };
        let app = make_app(config, engine.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            engine,
            _data_dir: data_dir,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    /// Directory holding the engine's JSON files
    pub fn data_dir(&self) -> &Path {
        self._data_dir.path()
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);
        while start.elapsed() < timeout {
            if let Ok(response) = client.get(&self.base_url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Server did not become ready within {:?}", timeout);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
