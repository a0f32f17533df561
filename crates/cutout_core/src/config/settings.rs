//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level
//! updates.

use serde::{Deserialize, Serialize};

use crate::models::{OutputFormat, RemovalModel};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Queue and admission settings.
    #[serde(default)]
    pub processing: ProcessingSettings,

    /// Removal capability settings.
    #[serde(default)]
    pub removal: RemovalSettings,

    /// Export settings.
    #[serde(default)]
    pub export: ExportSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Path configuration for output, temp, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder where saved results and archives land.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for temporary files (spilled results).
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_folder() -> String {
    "cutout_output".to_string()
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Queue and admission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Number of jobs processed at once.
    #[serde(default = "default_max_parallel_jobs")]
    pub max_parallel_jobs: usize,

    /// Maximum accepted input size in megabytes.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u32,
}

fn default_max_parallel_jobs() -> usize {
    crate::scheduler::DEFAULT_MAX_PARALLEL_JOBS
}

fn default_max_file_size_mb() -> u32 {
    12
}

impl ProcessingSettings {
    /// Maximum accepted input size in bytes.
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb as usize * 1024 * 1024
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            max_parallel_jobs: default_max_parallel_jobs(),
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

/// Removal capability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalSettings {
    /// External removal command.
    #[serde(default = "default_removal_command")]
    pub command: String,

    /// Model variant to run.
    #[serde(default)]
    pub model: RemovalModel,

    /// Output image format.
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Encoder quality in `0.0..=1.0`.
    #[serde(default = "default_quality")]
    pub quality: f32,
}

fn default_removal_command() -> String {
    "rembg".to_string()
}

fn default_quality() -> f32 {
    0.8
}

impl Default for RemovalSettings {
    fn default() -> Self {
        Self {
            command: default_removal_command(),
            model: RemovalModel::default(),
            output_format: OutputFormat::default(),
            quality: default_quality(),
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Prefix for generated archive names.
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,
}

fn default_archive_prefix() -> String {
    "cutouts".to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            archive_prefix: default_archive_prefix(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default log level when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Processing,
    Removal,
    Export,
    Logging,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Processing => "processing",
            ConfigSection::Removal => "removal",
            ConfigSection::Export => "export",
            ConfigSection::Logging => "logging",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[processing]"));
        assert!(toml.contains("max_parallel_jobs"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(
            parsed.processing.max_parallel_jobs,
            settings.processing.max_parallel_jobs
        );
        assert_eq!(parsed.removal.command, settings.removal.command);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[removal]\ncommand = \"my-remover\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        // Custom value preserved
        assert_eq!(parsed.removal.command, "my-remover");
        // Defaults applied for missing
        assert_eq!(parsed.processing.max_parallel_jobs, 2);
        assert_eq!(parsed.processing.max_file_size_mb, 12);
        assert_eq!(parsed.removal.output_format, OutputFormat::Png);
    }

    #[test]
    fn file_size_limit_converts_to_bytes() {
        let settings = ProcessingSettings::default();
        assert_eq!(settings.max_file_size_bytes(), 12 * 1024 * 1024);
    }
}
