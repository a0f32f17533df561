//! Cutout Core - Backend logic for Batch Cutout
//!
//! This crate contains all business logic for batch background removal
//! with zero UI dependencies. It can be driven by a GUI application or
//! any other frontend.
//!
//! The building blocks:
//! - `jobs` - the in-memory job store with admission validation
//! - `scheduler` - bounded-concurrency admission loop and workers
//! - `removal` - the background-removal capability boundary
//! - `export` - zip archiving and single-file downloads of results
//! - `session` - composition root tying the pieces together

pub mod config;
pub mod export;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod removal;
pub mod scheduler;
pub mod session;
pub mod summary;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
