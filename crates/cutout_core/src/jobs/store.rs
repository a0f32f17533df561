//! In-memory job store with admission validation.
//!
//! The store holds every known job in insertion order. Mutations are
//! synchronous and immediately visible to subsequent reads; callers that
//! share the store across tasks wrap it in `Arc<parking_lot::Mutex<_>>`.

use std::sync::Arc;

use super::types::{
    AdmissionReport, FileInput, Job, JobStatus, RejectedFile, ResultHandle, StoreError,
    ValidationError,
};
use crate::config::ProcessingSettings;
use crate::summary::Summary;

/// Produces fresh job ids. Injectable for deterministic tests.
pub type IdGenerator = Box<dyn Fn() -> String + Send>;

/// Limits enforced at admission.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    /// Maximum accepted input size in bytes.
    pub max_file_size: usize,
}

impl AdmissionPolicy {
    /// Default maximum input size (12 MB).
    pub const DEFAULT_MAX_FILE_SIZE: usize = 12 * 1024 * 1024;

    /// Build the policy from processing settings.
    pub fn from_settings(settings: &ProcessingSettings) -> Self {
        Self {
            max_file_size: settings.max_file_size_bytes(),
        }
    }
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// A pending job claimed for processing by the scheduler.
///
/// Carries everything the worker needs so it never has to re-lock the store
/// before the removal call.
#[derive(Debug, Clone)]
pub(crate) struct ClaimedJob {
    pub id: String,
    pub file_name: String,
    pub source: Arc<Vec<u8>>,
}

/// In-memory store of all known jobs, in insertion order.
pub struct JobStore {
    jobs: Vec<Job>,
    policy: AdmissionPolicy,
    id_gen: IdGenerator,
}

impl JobStore {
    /// Create a store with uuid-v4 job ids.
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self::with_id_generator(policy, Box::new(|| uuid::Uuid::new_v4().to_string()))
    }

    /// Create a store with a custom id generator (deterministic testing).
    pub fn with_id_generator(policy: AdmissionPolicy, id_gen: IdGenerator) -> Self {
        Self {
            jobs: Vec::new(),
            policy,
            id_gen,
        }
    }

    /// Number of jobs in the store.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Validate and admit one input as a pending job.
    pub fn add(&mut self, input: FileInput) -> Result<&Job, ValidationError> {
        self.validate(&input)?;

        let id = (self.id_gen)();
        tracing::debug!("admitted '{}' as job {}", input.name, id);
        self.jobs.push(Job::new(id, input));
        Ok(&self.jobs[self.jobs.len() - 1])
    }

    /// Admit a batch of inputs, collecting rejections in aggregate.
    ///
    /// A rejected input never blocks the accepted ones.
    pub fn add_all(&mut self, inputs: Vec<FileInput>) -> AdmissionReport {
        let mut report = AdmissionReport::default();
        for input in inputs {
            let file_name = input.name.clone();
            match self.add(input) {
                Ok(job) => report.added.push(job.id.clone()),
                Err(reason) => {
                    tracing::info!("rejected '{}': {}", file_name, reason);
                    report.rejected.push(RejectedFile { file_name, reason });
                }
            }
        }
        report
    }

    /// Get a job by id.
    pub fn get(&self, id: &str) -> Result<&Job, StoreError> {
        self.jobs
            .iter()
            .find(|j| j.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Remove a job and release its held resources.
    ///
    /// Removal is forbidden while the job is processing; the worker cannot
    /// be cancelled mid-flight, so the job must settle first.
    pub fn remove(&mut self, id: &str) -> Result<Job, StoreError> {
        let index = self
            .jobs
            .iter()
            .position(|j| j.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if self.jobs[index].status == JobStatus::Processing {
            return Err(StoreError::InvalidState {
                id: id.to_string(),
                operation: "removed",
                status: JobStatus::Processing,
            });
        }

        let job = self.jobs.remove(index);
        if let Some(result) = &job.result {
            result.release();
        }
        tracing::debug!("removed job {} ('{}')", job.id, job.file_name);
        Ok(job)
    }

    /// Remove all settled jobs (ready or error), releasing their resources.
    /// Returns the number of jobs removed.
    pub fn clear_settled(&mut self) -> usize {
        let before = self.jobs.len();
        for job in self.jobs.iter().filter(|j| j.is_settled()) {
            if let Some(result) = &job.result {
                result.release();
            }
        }
        self.jobs.retain(|j| !j.is_settled());
        before - self.jobs.len()
    }

    /// Put a failed job back into the pending queue.
    ///
    /// Only valid from the `Error` state; the caller must poke the scheduler
    /// afterwards so the job is re-admitted.
    pub fn retry(&mut self, id: &str) -> Result<(), StoreError> {
        let job = self
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if job.status != JobStatus::Error {
            return Err(StoreError::InvalidState {
                id: id.to_string(),
                operation: "retried",
                status: job.status,
            });
        }

        job.status = JobStatus::Pending;
        job.error_message = None;
        tracing::debug!("job {} queued for retry", id);
        Ok(())
    }

    /// Snapshot of all jobs in insertion order.
    pub fn all(&self) -> Vec<Job> {
        self.jobs.clone()
    }

    /// Snapshot of all ready jobs in insertion order.
    pub fn ready_jobs(&self) -> Vec<Job> {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Ready)
            .cloned()
            .collect()
    }

    /// Per-status counts.
    pub fn summary(&self) -> Summary {
        Summary::of(&self.jobs)
    }

    /// Claim the oldest pending job for processing.
    ///
    /// The transition to `Processing` (and the clearing of any prior error)
    /// happens here, under the caller's store lock, so a job can never be
    /// admitted twice.
    pub(crate) fn claim_next_pending(&mut self) -> Option<ClaimedJob> {
        let job = self
            .jobs
            .iter_mut()
            .find(|j| j.status == JobStatus::Pending)?;

        job.status = JobStatus::Processing;
        job.error_message = None;
        Some(ClaimedJob {
            id: job.id.clone(),
            file_name: job.file_name.clone(),
            source: Arc::clone(&job.source),
        })
    }

    /// Record a successful removal result.
    pub(crate) fn complete(&mut self, id: &str, bytes: Vec<u8>) {
        match self.jobs.iter_mut().find(|j| j.id == id) {
            Some(job) => {
                job.status = JobStatus::Ready;
                job.result = Some(ResultHandle::Inline(Arc::new(bytes)));
                job.error_message = None;
            }
            None => tracing::warn!("completion for unknown job {}", id),
        }
    }

    /// Record a failed removal attempt.
    pub(crate) fn fail(&mut self, id: &str, message: String) {
        match self.jobs.iter_mut().find(|j| j.id == id) {
            Some(job) => {
                job.status = JobStatus::Error;
                job.result = None;
                job.error_message = Some(message);
            }
            None => tracing::warn!("failure for unknown job {}", id),
        }
    }

    /// Validate an input against the admission policy.
    fn validate(&self, input: &FileInput) -> Result<(), ValidationError> {
        if input.bytes.is_empty() {
            return Err(ValidationError::EmptyFile {
                name: input.name.clone(),
            });
        }

        if input.size() > self.policy.max_file_size {
            return Err(ValidationError::TooLarge {
                name: input.name.clone(),
                size: input.size(),
                limit: self.policy.max_file_size,
            });
        }

        if input.mime_type.starts_with("image/") {
            return Ok(());
        }

        // No usable MIME type: fall back to magic-byte sniffing.
        if input.mime_type.is_empty() {
            if image::guess_format(&input.bytes).is_ok() {
                return Ok(());
            }
            return Err(ValidationError::UnsupportedType {
                name: input.name.clone(),
                mime_type: "unknown".to_string(),
            });
        }

        Err(ValidationError::UnsupportedType {
            name: input.name.clone(),
            mime_type: input.mime_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_policy() -> AdmissionPolicy {
        AdmissionPolicy { max_file_size: 64 }
    }

    fn png_input(name: &str) -> FileInput {
        FileInput::new(name, "image/png", vec![0u8; 16])
    }

    fn store_with_ids(policy: AdmissionPolicy) -> JobStore {
        let counter = std::sync::atomic::AtomicUsize::new(0);
        JobStore::with_id_generator(
            policy,
            Box::new(move || {
                let n = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                format!("job-{}", n)
            }),
        )
    }

    #[test]
    fn add_creates_pending_job_with_fresh_id() {
        let mut store = store_with_ids(small_policy());
        let id = store.add(png_input("a.png")).unwrap().id.clone();
        assert_eq!(id, "job-0");
        assert_eq!(store.get(&id).unwrap().status, JobStatus::Pending);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn oversized_file_never_enters_store() {
        let mut store = store_with_ids(small_policy());
        let err = store
            .add(FileInput::new("big.png", "image/png", vec![0u8; 65]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { size: 65, .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn non_image_never_enters_store() {
        let mut store = store_with_ids(small_policy());
        let err = store
            .add(FileInput::new("notes.txt", "text/plain", vec![1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn missing_mime_type_falls_back_to_sniffing() {
        let mut store = store_with_ids(small_policy());

        // A real PNG header passes the sniff.
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        assert!(store.add(FileInput::new("header.png", "", png)).is_ok());

        // Arbitrary bytes do not.
        let err = store
            .add(FileInput::new("blob.bin", "", vec![0u8; 8]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
    }

    #[test]
    fn add_all_reports_rejections_in_aggregate() {
        let mut store = store_with_ids(small_policy());
        let report = store.add_all(vec![
            FileInput::new("big.png", "image/png", vec![0u8; 65]),
            png_input("ok.png"),
        ]);

        assert_eq!(report.accepted_count(), 1);
        assert_eq!(report.rejected_count(), 1);
        assert_eq!(report.rejected[0].file_name, "big.png");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn all_preserves_insertion_order() {
        let mut store = store_with_ids(small_policy());
        store.add(png_input("a.png")).unwrap();
        store.add(png_input("b.png")).unwrap();
        store.add(png_input("c.png")).unwrap();

        let names: Vec<_> = store.all().into_iter().map(|j| j.file_name).collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn claim_takes_oldest_pending_and_marks_processing() {
        let mut store = store_with_ids(small_policy());
        store.add(png_input("a.png")).unwrap();
        store.add(png_input("b.png")).unwrap();

        let claim = store.claim_next_pending().unwrap();
        assert_eq!(claim.file_name, "a.png");
        assert_eq!(store.get(&claim.id).unwrap().status, JobStatus::Processing);

        let second = store.claim_next_pending().unwrap();
        assert_eq!(second.file_name, "b.png");
        assert!(store.claim_next_pending().is_none());
    }

    #[test]
    fn remove_is_rejected_while_processing() {
        let mut store = store_with_ids(small_policy());
        store.add(png_input("a.png")).unwrap();
        let claim = store.claim_next_pending().unwrap();

        let err = store.remove(&claim.id).unwrap_err();
        assert!(matches!(err, StoreError::InvalidState { .. }));

        // After the job settles, removal succeeds.
        store.complete(&claim.id, vec![1]);
        assert!(store.remove(&claim.id).is_ok());
        assert!(store.is_empty());
    }

    #[test]
    fn remove_missing_job_is_not_found() {
        let mut store = store_with_ids(small_policy());
        assert!(matches!(
            store.remove("nope").unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn retry_only_from_error() {
        let mut store = store_with_ids(small_policy());
        let id = store.add(png_input("a.png")).unwrap().id.clone();

        // Pending jobs cannot be retried.
        assert!(matches!(
            store.retry(&id).unwrap_err(),
            StoreError::InvalidState { .. }
        ));

        let claim = store.claim_next_pending().unwrap();
        store.fail(&claim.id, "model exploded".to_string());
        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error_message.as_deref(), Some("model exploded"));

        // Retry goes back through pending, with the message cleared.
        store.retry(&id).unwrap();
        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn complete_sets_result_and_clears_error() {
        let mut store = store_with_ids(small_policy());
        let id = store.add(png_input("a.png")).unwrap().id.clone();
        store.claim_next_pending().unwrap();
        store.complete(&id, vec![4, 5, 6]);

        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Ready);
        let bytes = job.result.as_ref().unwrap().materialize().unwrap();
        assert_eq!(*bytes, vec![4, 5, 6]);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn summary_counts_by_status() {
        let mut store = store_with_ids(small_policy());
        store.add(png_input("a.png")).unwrap();
        store.add(png_input("b.png")).unwrap();
        store.add(png_input("c.png")).unwrap();

        let first = store.claim_next_pending().unwrap();
        store.fail(&first.id, "boom".to_string());
        let second = store.claim_next_pending().unwrap();
        store.complete(&second.id, vec![1]);

        let summary = store.summary();
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.processing, 0);
        assert_eq!(summary.ready, 1);
        assert_eq!(summary.error, 1);
    }

    #[test]
    fn clear_settled_keeps_active_jobs() {
        let mut store = store_with_ids(small_policy());
        store.add(png_input("a.png")).unwrap();
        store.add(png_input("b.png")).unwrap();
        store.add(png_input("c.png")).unwrap();

        let first = store.claim_next_pending().unwrap();
        store.complete(&first.id, vec![1]);
        let second = store.claim_next_pending().unwrap();
        store.fail(&second.id, "boom".to_string());

        assert_eq!(store.clear_settled(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].file_name, "c.png");
    }
}
