//! Worker that runs one admitted job through the removal capability.

use std::sync::Arc;

use parking_lot::Mutex;

use super::SchedulerHandle;
use crate::jobs::{ClaimedJob, JobStore};
use crate::removal::{BackgroundRemover, RemovalOptions};

/// Process one claimed job, record the outcome, and report back.
///
/// The claim already moved the job to `Processing`; this future owns the job
/// until it settles. Exactly one worker runs per job, and the settle
/// notification is sent after the store has been updated, so the scheduler
/// never observes a freed slot before the outcome is visible.
pub(crate) async fn run(
    claim: ClaimedJob,
    remover: Arc<dyn BackgroundRemover>,
    options: RemovalOptions,
    store: Arc<Mutex<JobStore>>,
    scheduler: SchedulerHandle,
) {
    tracing::info!(
        "processing '{}' ({} bytes)",
        claim.file_name,
        claim.source.len()
    );

    let outcome = remover.remove(&claim.source, &options).await;

    {
        let mut store = store.lock();
        match outcome {
            Ok(bytes) => {
                tracing::info!("'{}' done, {} bytes out", claim.file_name, bytes.len());
                store.complete(&claim.id, bytes);
            }
            Err(err) => {
                tracing::warn!("'{}' failed: {}", claim.file_name, err);
                store.fail(&claim.id, err.to_string());
            }
        }
    }

    scheduler.notify_settled(claim.id);
}
