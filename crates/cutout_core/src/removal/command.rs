//! External removal tool wrapper.
//!
//! Pipes the source image into a configurable command (default `rembg`) on
//! stdin and reads the processed image from stdout. Model, format, and
//! quality travel as command-line flags.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{BackgroundRemover, RemovalError, RemovalOptions, RemovalResult};
use crate::config::RemovalSettings;

/// Removal capability backed by an external command.
#[derive(Debug, Clone)]
pub struct CommandRemover {
    program: String,
}

impl CommandRemover {
    /// Wrap the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the remover from the removal settings section.
    pub fn from_settings(settings: &RemovalSettings) -> Self {
        Self::new(settings.command.clone())
    }

    /// Flags passed to the tool for one request.
    fn args_for(options: &RemovalOptions) -> Vec<String> {
        vec![
            "--model".to_string(),
            options.model.as_str().to_string(),
            "--format".to_string(),
            options.output_format.extension().to_string(),
            "--quality".to_string(),
            format!("{}", options.quality),
        ]
    }
}

#[async_trait]
impl BackgroundRemover for CommandRemover {
    async fn remove(&self, image: &[u8], options: &RemovalOptions) -> RemovalResult<Vec<u8>> {
        let mut cmd = Command::new(&self.program);
        cmd.args(Self::args_for(options))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            "running {} ({} bytes in, model {})",
            self.program,
            image.len(),
            options.model
        );

        let mut child = cmd.spawn().map_err(|source| RemovalError::Launch {
            tool: self.program.clone(),
            source,
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemovalError::CommandFailed {
                tool: self.program.clone(),
                exit_code: output.status.code().unwrap_or(-1),
                message: stderr.trim().to_string(),
            });
        }

        if output.stdout.is_empty() {
            return Err(RemovalError::EmptyOutput);
        }

        tracing::debug!("{} produced {} bytes", self.program, output.stdout.len());
        Ok(output.stdout)
    }
}
