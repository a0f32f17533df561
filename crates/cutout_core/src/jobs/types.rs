//! Job types and admission data structures.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of a job in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Admitted, waiting for a processing slot.
    #[default]
    Pending,
    /// Currently running through the removal capability.
    Processing,
    /// Completed successfully, result available.
    Ready,
    /// Failed with an error; can be retried.
    Error,
}

impl JobStatus {
    /// Get display string for UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file handed to the admission boundary.
#[derive(Debug, Clone)]
pub struct FileInput {
    /// Original file name, used for result naming.
    pub name: String,
    /// Declared MIME type; may be empty, in which case the store sniffs
    /// the bytes instead.
    pub mime_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl FileInput {
    /// Create a new input.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Size of the input in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Where a result's bytes currently live.
#[derive(Debug, Clone)]
pub enum ResultHandle {
    /// Result bytes held in memory.
    Inline(Arc<Vec<u8>>),
    /// Result spilled to a file; bytes are re-read on demand. A missing
    /// file at export time excludes the job from the archive rather than
    /// failing the export.
    Spilled(PathBuf),
}

impl ResultHandle {
    /// Load the result bytes.
    pub fn materialize(&self) -> std::io::Result<Arc<Vec<u8>>> {
        match self {
            ResultHandle::Inline(bytes) => Ok(Arc::clone(bytes)),
            ResultHandle::Spilled(path) => std::fs::read(path).map(Arc::new),
        }
    }

    /// Delete any backing file. Called when the owning job is removed.
    pub(crate) fn release(&self) {
        if let ResultHandle::Spilled(path) = self {
            if let Err(err) = std::fs::remove_file(path) {
                tracing::warn!("could not delete spilled result {}: {}", path.display(), err);
            }
        }
    }
}

/// One unit of background-removal work.
///
/// A job is created by admission, mutated only by its worker (or by explicit
/// retry/remove), and destroyed on removal. Snapshots returned by the store
/// share the source and result bytes via `Arc`.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique job identifier. Never changes.
    pub id: String,
    /// Original file name.
    pub file_name: String,
    /// MIME type recorded at admission.
    pub mime_type: String,
    /// Original input bytes. Immutable.
    pub source: Arc<Vec<u8>>,
    /// Current status.
    pub status: JobStatus,
    /// Result handle; present exactly when status is `Ready`.
    pub result: Option<ResultHandle>,
    /// Error message; present exactly when status is `Error`.
    pub error_message: Option<String>,
    /// RFC 3339 timestamp of admission.
    pub created_at: String,
}

impl Job {
    /// Create a new pending job from an admitted input.
    pub(crate) fn new(id: String, input: FileInput) -> Self {
        Self {
            id,
            file_name: input.name,
            mime_type: input.mime_type,
            source: Arc::new(input.bytes),
            status: JobStatus::Pending,
            result: None,
            error_message: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// True once the job has reached `Ready` or `Error`.
    pub fn is_settled(&self) -> bool {
        matches!(self.status, JobStatus::Ready | JobStatus::Error)
    }

    /// Size of the source in bytes.
    pub fn source_size(&self) -> usize {
        self.source.len()
    }
}

/// Reason a file was rejected at admission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file '{name}' is empty")]
    EmptyFile { name: String },

    #[error("file '{name}' is too large ({size} bytes, limit {limit})")]
    TooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    #[error("file '{name}' is not an image (type '{mime_type}')")]
    UnsupportedType { name: String, mime_type: String },
}

/// Errors from store operations on existing jobs.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No job with the given id.
    #[error("no job with id '{0}'")]
    NotFound(String),

    /// The operation is not allowed in the job's current state.
    #[error("job '{id}' cannot be {operation} while {status}")]
    InvalidState {
        id: String,
        operation: &'static str,
        status: JobStatus,
    },

    /// Admission validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A file that was rejected during a batch add.
#[derive(Debug, Clone)]
pub struct RejectedFile {
    /// Name of the rejected file.
    pub file_name: String,
    /// Why it was rejected.
    pub reason: ValidationError,
}

/// Aggregate outcome of a batch add.
///
/// Rejections never block accepted files; callers report the rejected count
/// and carry on with the added jobs.
#[derive(Debug, Default)]
pub struct AdmissionReport {
    /// Ids of jobs created, in input order.
    pub added: Vec<String>,
    /// Inputs that failed validation.
    pub rejected: Vec<RejectedFile>,
}

impl AdmissionReport {
    /// Number of jobs created.
    pub fn accepted_count(&self) -> usize {
        self.added.len()
    }

    /// Number of inputs rejected.
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}
