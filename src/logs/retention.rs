//! Time-based pruning of task and execution logs.

use super::store::LogStore;
use crate::persistence::PersistenceHandle;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically drops log entries older than the retention horizon.
pub struct LogRetention {
    logs: Arc<LogStore>,
    persistence: Option<PersistenceHandle>,
    retention_days: u64,
    interval: Duration,
}

impl LogRetention {
    pub fn new(
        logs: Arc<LogStore>,
        persistence: Option<PersistenceHandle>,
        retention_days: u64,
        interval: Duration,
    ) -> Self {
        Self {
            logs,
            persistence,
            retention_days,
            interval,
        }
    }

    pub fn cutoff(&self, now: NaiveDateTime) -> NaiveDateTime {
        now - ChronoDuration::days(self.retention_days as i64)
    }

    /// Returns how many task log entries were removed.
    pub fn prune_once(&self) -> usize {
        let cutoff = self.cutoff(Local::now().naive_local());
        debug!(
            "Pruning logs older than {} days (cutoff: {})",
            self.retention_days, cutoff
        );
        let removed = self.logs.prune_older_than(cutoff);
        if removed > 0 {
            info!("Pruned {} old task log entries", removed);
            if let Some(persistence) = &self.persistence {
                persistence.save_logs();
            }
        }
        removed
    }

    /// Prunes immediately, then on every interval until shutdown.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Log retention enabled: retaining {} days, pruning every {:?}",
                self.retention_days, self.interval
            );
            let mut ticker = tokio::time::interval(self.interval.max(Duration::from_secs(1)));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.prune_once();
                    }
                    _ = shutdown.cancelled() => {
                        debug!("Log retention task stopping");
                        break;
                    }
                }
            }
        })
    }
}
