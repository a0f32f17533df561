//! Bounded-concurrency admission scheduler.
//!
//! A single event-loop task owns admission: it consumes queue events from an
//! mpsc channel and, while slots are free, claims the oldest pending job and
//! spawns a worker for it. Because admission happens in exactly one place,
//! re-admission after completions and retries is idempotent and no job can
//! ever run twice concurrently.

mod worker;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::jobs::JobStore;
use crate::removal::{BackgroundRemover, RemovalOptions};
use crate::summary::StatusNotifier;

/// Default number of jobs processed at once.
pub const DEFAULT_MAX_PARALLEL_JOBS: usize = 2;

/// Events consumed by the scheduler loop.
#[derive(Debug)]
pub enum QueueEvent {
    /// Jobs were added to the store, or a failed job was queued for retry.
    JobsAdded,
    /// A worker finished (success or failure), freeing a slot.
    JobSettled { job_id: String },
    /// Stop the loop. In-flight workers still settle their jobs.
    Shutdown,
}

/// Handle for poking the scheduler loop.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<QueueEvent>,
}

impl SchedulerHandle {
    /// Tell the scheduler that pending jobs may be waiting.
    ///
    /// Must be called after every addition and every retry. Safe to call
    /// at any time; a scan with no free slot or no pending job is a no-op.
    pub fn notify_added(&self) {
        let _ = self.tx.send(QueueEvent::JobsAdded);
    }

    /// Tell the scheduler a job has settled.
    pub(crate) fn notify_settled(&self, job_id: String) {
        let _ = self.tx.send(QueueEvent::JobSettled { job_id });
    }

    /// Stop the scheduler loop.
    pub fn shutdown(&self) {
        let _ = self.tx.send(QueueEvent::Shutdown);
    }
}

/// Spawn the scheduler loop onto the current Tokio runtime.
///
/// The loop runs until [`SchedulerHandle::shutdown`] is called;
/// [`crate::session::BatchSession`] does this on drop.
pub fn spawn_scheduler(
    store: Arc<Mutex<JobStore>>,
    remover: Arc<dyn BackgroundRemover>,
    options: RemovalOptions,
    limit: usize,
    notifier: Arc<StatusNotifier>,
) -> SchedulerHandle {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = SchedulerHandle { tx };
    let worker_handle = handle.clone();

    tokio::spawn(async move {
        let limit = limit.max(1);
        let mut active = 0usize;

        while let Some(event) = rx.recv().await {
            match event {
                QueueEvent::JobsAdded => {}
                QueueEvent::JobSettled { job_id } => {
                    active = active.saturating_sub(1);
                    tracing::debug!("job {} settled, {} of {} slots busy", job_id, active, limit);
                }
                QueueEvent::Shutdown => break,
            }

            while active < limit {
                let claimed = store.lock().claim_next_pending();
                let Some(claim) = claimed else { break };

                active += 1;
                tracing::debug!(
                    "admitting job {} ('{}'), {} of {} slots busy",
                    claim.id,
                    claim.file_name,
                    active,
                    limit
                );
                tokio::spawn(worker::run(
                    claim,
                    Arc::clone(&remover),
                    options.clone(),
                    Arc::clone(&store),
                    worker_handle.clone(),
                ));
            }

            let summary = store.lock().summary();
            notifier.announce_summary(&summary);
        }

        tracing::debug!("scheduler loop stopped");
    });

    handle
}
