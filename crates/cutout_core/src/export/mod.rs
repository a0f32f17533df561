//! Archive export and single-file downloads for completed jobs.
//!
//! Exporting takes a snapshot of ready jobs and bundles their result bytes
//! into one in-memory zip. Entry names derive from the original file names;
//! collisions get a numeric suffix. Export never mutates job status.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::Arc;

use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::jobs::{Job, JobStatus};
use crate::models::OutputFormat;

/// Errors from export operations. These abort only the export; the queue is
/// untouched.
#[derive(Error, Debug)]
pub enum ExportError {
    /// No ready job contributed any bytes. Distinct from a hard failure so
    /// the UI can say "nothing to export" instead of reporting an error.
    #[error("no completed images to export")]
    NothingToExport,

    /// Download requested for an id that is not in the store.
    #[error("no job with id '{0}'")]
    UnknownJob(String),

    /// Download requested for a job without a result.
    #[error("job '{0}' has no result to download")]
    NotReady(String),

    /// The archive builder failed.
    #[error("failed to build archive: {0}")]
    Archive(#[from] ZipError),

    /// I/O failure while writing archive bytes.
    #[error("failed to write archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// A single result prepared for download.
#[derive(Debug, Clone)]
pub struct Download {
    /// Suggested file name.
    pub file_name: String,
    /// MIME type of the bytes.
    pub media_type: &'static str,
    /// The encoded image.
    pub bytes: Arc<Vec<u8>>,
}

/// A finished archive of ready results.
#[derive(Debug, Clone)]
pub struct Archive {
    /// Suggested archive file name.
    pub file_name: String,
    /// The zip bytes.
    pub bytes: Vec<u8>,
    /// Number of entries included.
    pub entries: usize,
    /// Ready jobs excluded because their bytes could not be materialized.
    pub skipped: usize,
}

/// Builds downloads and archives from ready jobs.
#[derive(Debug, Clone)]
pub struct ArchiveExporter {
    format: OutputFormat,
    archive_prefix: String,
}

impl ArchiveExporter {
    /// Create an exporter for the given output format.
    pub fn new(format: OutputFormat, archive_prefix: impl Into<String>) -> Self {
        Self {
            format,
            archive_prefix: archive_prefix.into(),
        }
    }

    /// Download file name for a job's result, derived from its original
    /// file name and the configured output extension.
    pub fn download_name(&self, original: &str) -> String {
        format!("{}.{}", sanitize_stem(original), self.format.extension())
    }

    /// Prepare a single ready job's result for download.
    pub fn single(&self, job: &Job) -> ExportResult<Download> {
        let handle = match (job.status, job.result.as_ref()) {
            (JobStatus::Ready, Some(handle)) => handle,
            _ => return Err(ExportError::NotReady(job.id.clone())),
        };

        let bytes = handle.materialize()?;
        Ok(Download {
            file_name: self.download_name(&job.file_name),
            media_type: self.format.media_type(),
            bytes,
        })
    }

    /// Bundle all ready jobs in the snapshot into one zip archive.
    ///
    /// A ready job whose bytes cannot be materialized is logged and
    /// excluded. If no job contributes bytes the export signals
    /// [`ExportError::NothingToExport`] and no archive is produced.
    pub fn export_ready(&self, jobs: &[Job]) -> ExportResult<Archive> {
        let mut entries: Vec<(String, Arc<Vec<u8>>)> = Vec::new();
        let mut used = HashSet::new();
        let mut skipped = 0usize;

        for job in jobs.iter().filter(|j| j.status == JobStatus::Ready) {
            let Some(handle) = job.result.as_ref() else {
                tracing::warn!("job {} is ready but holds no result", job.id);
                skipped += 1;
                continue;
            };

            match handle.materialize() {
                Ok(bytes) => {
                    let name =
                        unique_name(&mut used, &sanitize_stem(&job.file_name), self.format);
                    entries.push((name, bytes));
                }
                Err(err) => {
                    tracing::warn!("excluding job {} from archive: {}", job.id, err);
                    skipped += 1;
                }
            }
        }

        if entries.is_empty() {
            return Err(ExportError::NothingToExport);
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in &entries {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(bytes)?;
        }
        let cursor = writer.finish()?;

        let file_name = format!(
            "{}-{}.zip",
            self.archive_prefix,
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        );
        tracing::info!(
            "archived {} image(s) into {} ({} skipped)",
            entries.len(),
            file_name,
            skipped
        );

        Ok(Archive {
            file_name,
            bytes: cursor.into_inner(),
            entries: entries.len(),
            skipped,
        })
    }
}

/// Strip any path, extension, and unsafe characters from a file name.
fn sanitize_stem(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = base.rsplit_once('.').map(|(s, _)| s).unwrap_or(base);

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Pick an archive entry name that has not been used yet.
fn unique_name(used: &mut HashSet<String>, stem: &str, format: OutputFormat) -> String {
    let candidate = format!("{}.{}", stem, format.extension());
    if used.insert(candidate.clone()) {
        return candidate;
    }

    let mut n = 2;
    loop {
        let candidate = format!("{}-{}.{}", stem, n, format.extension());
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
