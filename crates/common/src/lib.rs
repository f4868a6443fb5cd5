//! frameaudit Common Utilities
//!
//! Shared infrastructure for all frameaudit crates:
//! - Error taxonomy and result aliases
//! - Tracing/logging initialization
//! - Configuration loading
//! - Lookup of external programs

pub mod config;
pub mod error;
pub mod logging;
pub mod process;

pub use config::*;
pub use error::*;
