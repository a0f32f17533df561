//! Queue summary counts and user-facing status announcements.
//!
//! The summary is recomputed from the store after every mutation and handed
//! to the UI boundary; announcements are plain strings suitable for a status
//! bar or a screen-reader live region.

use serde::Serialize;

use crate::jobs::{Job, JobStatus};

/// Per-status counts over the current job store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Jobs waiting for a processing slot.
    pub pending: usize,
    /// Jobs currently running through the removal capability.
    pub processing: usize,
    /// Jobs with a downloadable result.
    pub ready: usize,
    /// Jobs that failed and can be retried.
    pub error: usize,
}

impl Summary {
    /// Count statuses over a job snapshot.
    pub fn of(jobs: &[Job]) -> Self {
        let mut summary = Summary::default();
        for job in jobs {
            match job.status {
                JobStatus::Pending => summary.pending += 1,
                JobStatus::Processing => summary.processing += 1,
                JobStatus::Ready => summary.ready += 1,
                JobStatus::Error => summary.error += 1,
            }
        }
        summary
    }

    /// Jobs that have not settled yet.
    pub fn active(&self) -> usize {
        self.pending + self.processing
    }

    /// All jobs in the store.
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.ready + self.error
    }

    /// True when no job is waiting or running.
    pub fn is_idle(&self) -> bool {
        self.active() == 0
    }

    /// Human-readable status line for announcements.
    pub fn status_line(&self) -> String {
        if self.total() == 0 {
            return "no images in queue".to_string();
        }

        let mut parts = Vec::new();
        if self.processing > 0 {
            parts.push(format!("{} processing", self.processing));
        }
        if self.pending > 0 {
            parts.push(format!("{} waiting", self.pending));
        }
        if self.ready > 0 {
            parts.push(format!("{} ready", self.ready));
        }
        if self.error > 0 {
            parts.push(format!("{} failed", self.error));
        }
        parts.join(", ")
    }
}

/// Callback that receives status announcements for the UI.
pub type AnnounceCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Sink for human-readable status text.
///
/// Everything announced here also goes to the `tracing` log, so a headless
/// caller can run with a silent notifier and lose nothing.
pub struct StatusNotifier {
    callback: Option<AnnounceCallback>,
}

impl StatusNotifier {
    /// Notifier that forwards announcements to the given callback.
    pub fn new(callback: AnnounceCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Notifier that only logs.
    pub fn silent() -> Self {
        Self { callback: None }
    }

    /// Announce a message.
    pub fn announce(&self, message: &str) {
        tracing::info!("{}", message);
        if let Some(callback) = &self.callback {
            callback(message);
        }
    }

    /// Announce the current queue summary.
    pub fn announce_summary(&self, summary: &Summary) {
        self.announce(&summary.status_line());
    }

    /// Announce how many files were rejected at admission, if any.
    pub fn announce_rejections(&self, rejected: usize) {
        if rejected == 1 {
            self.announce("1 file could not be added");
        } else if rejected > 1 {
            self.announce(&format!("{} files could not be added", rejected));
        }
    }
}
