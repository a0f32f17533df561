//! Shared data types used across the crate.

mod enums;

pub use enums::{OutputFormat, RemovalModel};
