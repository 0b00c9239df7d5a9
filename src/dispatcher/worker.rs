use crate::executor::{Attempt, RequestSender};
use crate::variables::TaskVariant;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// One queued attempt: a variant and which repetition of it this is.
pub(super) struct Job {
    pub variant: Arc<TaskVariant>,
    pub repetition: u32,
}

pub(super) type JobQueue = Arc<Mutex<mpsc::Receiver<Job>>>;

/// Pulls jobs until the queue is exhausted or the run is cancelled. An attempt
/// already sent always runs to completion; after a stop its result is dropped.
pub(super) async fn run_worker(
    sender: Arc<dyn RequestSender>,
    jobs: JobQueue,
    results: mpsc::Sender<Attempt>,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let job = {
            let mut queue = jobs.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                job = queue.recv() => job,
            }
        };
        let Some(job) = job else {
            break;
        };
        trace!(
            "Variant {} repetition {} of task {}",
            job.variant.index,
            job.repetition + 1,
            job.variant.task_id
        );

        let attempt = sender.execute(&job.variant).await;
        if cancel.is_cancelled() || results.send(attempt).await.is_err() {
            break;
        }

        let delay = jitter(job.variant.delay_min, job.variant.delay_max);
        if !delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Uniform in `[min, max)` milliseconds, or zero when the range is empty.
pub(super) fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::ZERO;
    }
    let ms = rand::rng().random_range(min_ms..max_ms);
    Duration::from_millis(ms)
}
