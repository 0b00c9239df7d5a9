use super::Persistence;
use crate::logs::LogStore;
use crate::task::TaskStore;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

enum WriteRequest {
    Tasks,
    Logs,
    Schedules(Vec<String>),
    Flush(oneshot::Sender<()>),
}

/// Cheap handle used by the dispatcher and scheduler to request saves without
/// touching the disk themselves.
#[derive(Clone)]
pub struct PersistenceHandle {
    tx: mpsc::UnboundedSender<WriteRequest>,
}

impl PersistenceHandle {
    pub fn save_tasks(&self) {
        let _ = self.tx.send(WriteRequest::Tasks);
    }

    pub fn save_logs(&self) {
        let _ = self.tx.send(WriteRequest::Logs);
    }

    pub fn save_schedules(&self, task_ids: Vec<String>) {
        let _ = self.tx.send(WriteRequest::Schedules(task_ids));
    }

    /// Resolves once every save requested before this call has been written.
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(WriteRequest::Flush(tx))
            .map_err(|_| anyhow!("persistence writer is not running"))?;
        rx.await
            .map_err(|_| anyhow!("persistence writer stopped before flushing"))
    }
}

/// Background task that serializes saves. Requests that pile up while a write
/// is in progress collapse into a single write per collection.
pub struct PersistenceWriter {
    persistence: Arc<dyn Persistence>,
    tasks: Arc<TaskStore>,
    logs: Arc<LogStore>,
    rx: mpsc::UnboundedReceiver<WriteRequest>,
    shutdown: CancellationToken,
}

#[derive(Default)]
struct Pending {
    tasks: bool,
    logs: bool,
    schedules: Option<Vec<String>>,
    waiters: Vec<oneshot::Sender<()>>,
}

impl Pending {
    fn add(&mut self, request: WriteRequest) {
        match request {
            WriteRequest::Tasks => self.tasks = true,
            WriteRequest::Logs => self.logs = true,
            WriteRequest::Schedules(ids) => self.schedules = Some(ids),
            WriteRequest::Flush(waiter) => self.waiters.push(waiter),
        }
    }
}

impl PersistenceWriter {
    pub fn new(
        persistence: Arc<dyn Persistence>,
        tasks: Arc<TaskStore>,
        logs: Arc<LogStore>,
        shutdown: CancellationToken,
    ) -> (Self, PersistenceHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                persistence,
                tasks,
                logs,
                rx,
                shutdown,
            },
            PersistenceHandle { tx },
        )
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!("Persistence writer started");
        loop {
            tokio::select! {
                request = self.rx.recv() => {
                    let Some(request) = request else {
                        break;
                    };
                    let mut pending = Pending::default();
                    pending.add(request);
                    while let Ok(more) = self.rx.try_recv() {
                        pending.add(more);
                    }
                    self.write(pending);
                }
                _ = self.shutdown.cancelled() => {
                    break;
                }
            }
        }

        // Drain whatever is still queued, then write everything once more so
        // the last in-memory state reaches disk.
        let mut pending = Pending {
            tasks: true,
            logs: true,
            ..Default::default()
        };
        while let Ok(more) = self.rx.try_recv() {
            pending.add(more);
        }
        self.write(pending);
        info!("Persistence writer stopped");
    }

    fn write(&self, pending: Pending) {
        if pending.tasks {
            if let Err(e) = self.persistence.save_tasks(&self.tasks.snapshot()) {
                error!("Failed to save tasks: {:#}", e);
            }
        }
        if pending.logs {
            if let Err(e) = self.persistence.save_logs(&self.logs.snapshot()) {
                error!("Failed to save logs: {:#}", e);
            }
        }
        if let Some(ids) = pending.schedules {
            if let Err(e) = self.persistence.save_schedules(&ids) {
                error!("Failed to save schedules: {:#}", e);
            }
        }
        if !pending.waiters.is_empty() {
            debug!("Flushed persistence for {} waiter(s)", pending.waiters.len());
        }
        for waiter in pending.waiters {
            let _ = waiter.send(());
        }
    }
}
