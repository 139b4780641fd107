//! Logging utilities for the gateway
//!
//! This module provides logging initialization and convenient re-exports
//! of the log crate macros for consistent logging across the library.

/// Initialize logging with the specified level
///
/// `RUST_LOG`, when set, takes precedence over `level`. Fails if a logger
/// has already been installed for the process.
pub fn init(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init()
}

// Re-export the log crate and its macros
pub use log::{LevelFilter, debug, error, info, trace, warn};
