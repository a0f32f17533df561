//! Composition root for a batch background-removal session.
//!
//! A [`BatchSession`] owns the job store, the scheduler loop, the notifier,
//! and the exporter, and exposes the operations a frontend drives: add
//! files, retry, remove, download, export. Must be created inside a Tokio
//! runtime; the scheduler loop is spawned onto it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Settings;
use crate::export::{Archive, ArchiveExporter, Download, ExportError, ExportResult};
use crate::jobs::{AdmissionPolicy, AdmissionReport, FileInput, Job, JobStore, StoreError};
use crate::removal::{BackgroundRemover, RemovalOptions};
use crate::scheduler::{spawn_scheduler, SchedulerHandle};
use crate::summary::{AnnounceCallback, StatusNotifier, Summary};

/// One in-memory batch session: a store, a scheduler, and an exporter.
///
/// Nothing survives the session; there is no persistence and no resume.
pub struct BatchSession {
    store: Arc<Mutex<JobStore>>,
    scheduler: SchedulerHandle,
    notifier: Arc<StatusNotifier>,
    exporter: ArchiveExporter,
}

impl BatchSession {
    /// Create a session without an announcement sink.
    pub fn new(settings: &Settings, remover: Arc<dyn BackgroundRemover>) -> Self {
        Self::build(settings, remover, StatusNotifier::silent())
    }

    /// Create a session that announces status changes to the given callback.
    pub fn with_announcer(
        settings: &Settings,
        remover: Arc<dyn BackgroundRemover>,
        callback: AnnounceCallback,
    ) -> Self {
        Self::build(settings, remover, StatusNotifier::new(callback))
    }

    fn build(
        settings: &Settings,
        remover: Arc<dyn BackgroundRemover>,
        notifier: StatusNotifier,
    ) -> Self {
        let notifier = Arc::new(notifier);
        let store = Arc::new(Mutex::new(JobStore::new(AdmissionPolicy::from_settings(
            &settings.processing,
        ))));

        let scheduler = spawn_scheduler(
            Arc::clone(&store),
            remover,
            RemovalOptions::from_settings(&settings.removal),
            settings.processing.max_parallel_jobs,
            Arc::clone(&notifier),
        );

        let exporter = ArchiveExporter::new(
            settings.removal.output_format,
            settings.export.archive_prefix.clone(),
        );

        Self {
            store,
            scheduler,
            notifier,
            exporter,
        }
    }

    /// Validate and enqueue a batch of files.
    ///
    /// Rejected files are reported in the returned aggregate and never block
    /// the accepted ones, which start processing immediately.
    pub fn add_files(&self, inputs: Vec<FileInput>) -> AdmissionReport {
        let report = self.store.lock().add_all(inputs);

        if report.accepted_count() > 0 {
            self.scheduler.notify_added();
        }
        self.notifier.announce_rejections(report.rejected_count());

        report
    }

    /// Re-queue a failed job.
    pub fn retry(&self, id: &str) -> Result<(), StoreError> {
        self.store.lock().retry(id)?;
        self.scheduler.notify_added();
        Ok(())
    }

    /// Remove a job and release its resources. Forbidden while processing.
    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let job = self.store.lock().remove(id)?;
        self.notifier
            .announce(&format!("removed '{}' from the queue", job.file_name));
        self.notifier.announce_summary(&self.summary());
        Ok(())
    }

    /// Remove all settled jobs, returning how many were dropped.
    pub fn clear_settled(&self) -> usize {
        let cleared = self.store.lock().clear_settled();
        if cleared > 0 {
            self.notifier
                .announce(&format!("cleared {} finished job(s)", cleared));
            self.notifier.announce_summary(&self.summary());
        }
        cleared
    }

    /// Snapshot of all jobs in insertion order.
    pub fn jobs(&self) -> Vec<Job> {
        self.store.lock().all()
    }

    /// Current per-status counts.
    pub fn summary(&self) -> Summary {
        self.store.lock().summary()
    }

    /// Prepare one ready job's result for download.
    pub fn download(&self, id: &str) -> ExportResult<Download> {
        let job = {
            let store = self.store.lock();
            store
                .get(id)
                .cloned()
                .map_err(|_| ExportError::UnknownJob(id.to_string()))?
        };
        self.exporter.single(&job)
    }

    /// Bundle all ready results into a zip archive.
    ///
    /// The snapshot is taken under the store lock; the archive is built
    /// outside it, so processing continues while the zip is written.
    pub fn export_ready(&self) -> ExportResult<Archive> {
        let ready = self.store.lock().ready_jobs();
        let archive = self.exporter.export_ready(&ready)?;
        self.notifier.announce(&format!(
            "exported {} image(s) to {}",
            archive.entries, archive.file_name
        ));
        Ok(archive)
    }
}

impl Drop for BatchSession {
    fn drop(&mut self) {
        self.scheduler.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::jobs::JobStatus;
    use crate::removal::{RemovalError, RemovalResult};

    /// Remover that returns the source bytes reversed.
    struct EchoRemover;

    #[async_trait]
    impl BackgroundRemover for EchoRemover {
        async fn remove(&self, image: &[u8], _: &RemovalOptions) -> RemovalResult<Vec<u8>> {
            let mut out = image.to_vec();
            out.reverse();
            Ok(out)
        }
    }

    /// Remover that fails while the flag is set.
    struct FlakyRemover {
        failing: AtomicBool,
    }

    #[async_trait]
    impl BackgroundRemover for FlakyRemover {
        async fn remove(&self, image: &[u8], _: &RemovalOptions) -> RemovalResult<Vec<u8>> {
            if self.failing.load(Ordering::SeqCst) {
                Err(RemovalError::EmptyOutput)
            } else {
                Ok(image.to_vec())
            }
        }
    }

    fn png(name: &str) -> FileInput {
        FileInput::new(name, "image/png", vec![1, 2, 3, 4])
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within 5s");
    }

    #[tokio::test]
    async fn batch_flows_from_add_to_export() {
        let session = BatchSession::new(&Settings::default(), Arc::new(EchoRemover));

        let report = session.add_files(vec![png("a.png"), png("b.png"), png("c.png")]);
        assert_eq!(report.accepted_count(), 3);
        assert_eq!(report.rejected_count(), 0);

        wait_until(|| session.summary().ready == 3).await;

        let archive = session.export_ready().unwrap();
        assert_eq!(archive.entries, 3);
        assert_eq!(archive.skipped, 0);

        // Export does not mutate job status.
        assert_eq!(session.summary().ready, 3);
    }

    #[tokio::test]
    async fn rejected_files_do_not_block_accepted_ones() {
        let session = BatchSession::new(&Settings::default(), Arc::new(EchoRemover));

        let report = session.add_files(vec![
            FileInput::new("notes.txt", "text/plain", vec![1, 2]),
            png("ok.png"),
        ]);
        assert_eq!(report.accepted_count(), 1);
        assert_eq!(report.rejected_count(), 1);

        wait_until(|| session.summary().ready == 1).await;
        assert_eq!(session.jobs().len(), 1);
    }

    #[tokio::test]
    async fn download_returns_processed_bytes() {
        let session = BatchSession::new(&Settings::default(), Arc::new(EchoRemover));
        let report = session.add_files(vec![png("photo.heic")]);
        let id = report.added[0].clone();

        wait_until(|| session.summary().ready == 1).await;

        let download = session.download(&id).unwrap();
        assert_eq!(download.file_name, "photo.png");
        assert_eq!(*download.bytes, vec![4, 3, 2, 1]);

        assert!(matches!(
            session.download("missing").unwrap_err(),
            ExportError::UnknownJob(_)
        ));
    }

    #[tokio::test]
    async fn export_with_nothing_ready_is_not_a_crash() {
        let session = BatchSession::new(&Settings::default(), Arc::new(EchoRemover));
        let err = session.export_ready().unwrap_err();
        assert!(matches!(err, ExportError::NothingToExport));
    }

    #[tokio::test]
    async fn retry_after_failure_reaches_ready() {
        let remover = Arc::new(FlakyRemover {
            failing: AtomicBool::new(true),
        });
        let session = BatchSession::new(&Settings::default(), remover.clone());

        let report = session.add_files(vec![png("a.png")]);
        let id = report.added[0].clone();

        wait_until(|| session.summary().error == 1).await;

        // Retrying anything but an error state is rejected.
        let other = session.add_files(vec![png("b.png")]);
        wait_until(|| session.summary().ready == 1).await;
        assert!(matches!(
            session.retry(&other.added[0]).unwrap_err(),
            StoreError::InvalidState { .. }
        ));

        remover.failing.store(false, Ordering::SeqCst);
        session.retry(&id).unwrap();
        wait_until(|| session.summary().ready == 2).await;
        assert!(session
            .jobs()
            .iter()
            .all(|j| j.status == JobStatus::Ready && j.error_message.is_none()));
    }

    #[tokio::test]
    async fn announcements_reach_the_callback() {
        let seen: Arc<std::sync::Mutex<Vec<String>>> =
            Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let session = BatchSession::with_announcer(
            &Settings::default(),
            Arc::new(EchoRemover),
            Box::new(move |msg| sink.lock().unwrap().push(msg.to_string())),
        );

        session.add_files(vec![
            png("a.png"),
            FileInput::new("broken.txt", "text/plain", vec![0]),
        ]);

        wait_until(|| session.summary().ready == 1).await;
        wait_until(|| {
            let seen = seen.lock().unwrap();
            seen.iter().any(|m| m.contains("could not be added"))
                && seen.iter().any(|m| m.contains("1 ready"))
        })
        .await;
    }
}
