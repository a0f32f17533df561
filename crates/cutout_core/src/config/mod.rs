//! Configuration management.
//!
//! TOML settings split into sections, loaded and saved atomically by the
//! [`ConfigManager`].

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, ExportSettings, LoggingSettings, PathSettings, ProcessingSettings,
    RemovalSettings, Settings,
};
