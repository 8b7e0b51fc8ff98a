// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging initialization for rclkit

use crate::env_config::EnvConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("a global logger is already installed")]
    AlreadyInstalled(#[from] log::SetLoggerError),
}

/// Initialize console logging at `level`.
///
/// # Example
/// ```no_run
/// rclkit::logging::init_logging(log::LevelFilter::Info).ok();
/// ```
pub fn init_logging(level: log::LevelFilter) -> Result<(), LoggingError> {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .try_init()?;
    Ok(())
}

/// Initialize logging with environment variable override
///
/// Reads `RUST_LOG` if set, otherwise uses `default_level`.
pub fn init_logging_env(default_level: log::LevelFilter) -> Result<(), LoggingError> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level.to_string()),
    )
    .format_timestamp_millis()
    .try_init()?;
    Ok(())
}

/// Initialize logging with a filter string such as `"rclkit=debug,info"`.
pub fn init_logging_with_filter(filter: &str) -> Result<(), LoggingError> {
    env_logger::Builder::new()
        .parse_filters(filter)
        .format_timestamp_millis()
        .try_init()?;
    Ok(())
}

/// `RUST_LOG` if set, otherwise the level from `RCLKIT_LOG_LEVEL`.
pub fn init_logging_from_config(config: &EnvConfig) -> Result<(), LoggingError> {
    init_logging_env(config.log_level_filter())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_reported() {
        // Whichever call runs first installs the logger for the test binary.
        let _ = init_logging_with_filter("rclkit=debug");
        assert!(matches!(
            init_logging(log::LevelFilter::Warn),
            Err(LoggingError::AlreadyInstalled(_))
        ));
    }
}
