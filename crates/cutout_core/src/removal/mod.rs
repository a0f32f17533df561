//! Background-removal capability boundary.
//!
//! The segmentation model itself is an opaque external tool. The core only
//! depends on the narrow [`BackgroundRemover`] trait, so the scheduler and
//! workers can be exercised with deterministic fakes in tests and the real
//! tool can be swapped without touching the queue.

mod command;

pub use command::CommandRemover;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::RemovalSettings;
use crate::models::{OutputFormat, RemovalModel};

/// Options passed with every removal request.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalOptions {
    /// Model variant to run.
    pub model: RemovalModel,
    /// Format of the produced image.
    pub output_format: OutputFormat,
    /// Encoder quality in `0.0..=1.0` (ignored by lossless formats).
    pub quality: f32,
}

impl RemovalOptions {
    /// Default encoder quality.
    pub const DEFAULT_QUALITY: f32 = 0.8;

    /// Build options from the removal settings section.
    pub fn from_settings(settings: &RemovalSettings) -> Self {
        Self {
            model: settings.model,
            output_format: settings.output_format,
            quality: settings.quality,
        }
    }
}

impl Default for RemovalOptions {
    fn default() -> Self {
        Self {
            model: RemovalModel::default(),
            output_format: OutputFormat::default(),
            quality: Self::DEFAULT_QUALITY,
        }
    }
}

/// Errors from the removal capability.
///
/// These are recorded on the failing job as its error message; they never
/// abort sibling jobs or the scheduler.
#[derive(Error, Debug)]
pub enum RemovalError {
    /// The external tool could not be started.
    #[error("failed to launch removal tool '{tool}': {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The external tool ran and reported failure.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// The tool exited successfully but produced no bytes.
    #[error("removal tool produced no output")]
    EmptyOutput,

    /// I/O error while feeding or draining the tool.
    #[error("I/O error while talking to removal tool: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for removal operations.
pub type RemovalResult<T> = Result<T, RemovalError>;

/// Asynchronous background-removal capability.
///
/// Implementations may take arbitrarily long and may fail; timeout policy
/// belongs to the implementation, not to the queue.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Remove the background from one image, returning the encoded result.
    async fn remove(&self, image: &[u8], options: &RemovalOptions) -> RemovalResult<Vec<u8>>;
}
