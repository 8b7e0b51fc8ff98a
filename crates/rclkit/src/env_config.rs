// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Environment variable configuration for rclkit.
//!
//! - `RCLKIT_BACKEND`: runtime variant (default: "intra")
//! - `RCLKIT_DOMAIN_ID`: domain id (default: 0, or ROS_DOMAIN_ID if set)
//! - `RCLKIT_LOG_LEVEL`: logging level (default: "info")
//! - `RCLKIT_QUEUE_DEPTH`: default keep-last depth for new endpoints (default: 10)
//! - `RCLKIT_ALLOCATOR_BUDGET`: byte budget of the default allocator (default: unbounded)
//!
//! # Example
//!
//! ```bash
//! export RCLKIT_DOMAIN_ID=42
//! export RCLKIT_LOG_LEVEL=debug
//! export RCLKIT_QUEUE_DEPTH=50
//! ```

use rclkit_native::DEFAULT_QUEUE_DEPTH;
use std::env;
use std::str::FromStr;

/// Environment variable names
pub const ENV_BACKEND: &str = "RCLKIT_BACKEND";
pub const ENV_DOMAIN_ID: &str = "RCLKIT_DOMAIN_ID";
pub const ENV_LOG_LEVEL: &str = "RCLKIT_LOG_LEVEL";
pub const ENV_QUEUE_DEPTH: &str = "RCLKIT_QUEUE_DEPTH";
pub const ENV_ALLOCATOR_BUDGET: &str = "RCLKIT_ALLOCATOR_BUDGET";

/// ROS 2 environment variable for domain ID (fallback)
pub const ENV_ROS_DOMAIN_ID: &str = "ROS_DOMAIN_ID";

/// Highest domain id accepted by ROS 2 tooling.
pub const MAX_DOMAIN_ID: usize = 232;

/// Runtime configuration from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Runtime variant name (parsed by the backend selector)
    pub backend: String,

    /// Domain id (0-232)
    pub domain_id: usize,

    /// Logging level (trace, debug, info, warn, error, off)
    pub log_level: String,

    /// Default keep-last depth for publishers and subscriptions
    pub queue_depth: usize,

    /// Byte budget for the default allocator; `None` is unbounded
    pub allocator_budget: Option<usize>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            backend: "intra".to_string(),
            domain_id: 0,
            log_level: "info".to_string(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
            allocator_budget: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok().filter(|s| !s.trim().is_empty())?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("[config] ignoring invalid {}='{}'", name, raw);
            None
        }
    }
}

impl EnvConfig {
    /// Load configuration from environment variables
    ///
    /// Priority for domain ID:
    /// 1. RCLKIT_DOMAIN_ID
    /// 2. ROS_DOMAIN_ID
    /// 3. Default (0)
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let domain_id = parse_var::<usize>(ENV_DOMAIN_ID)
            .or_else(|| parse_var::<usize>(ENV_ROS_DOMAIN_ID))
            .filter(|&id| {
                let ok = id <= MAX_DOMAIN_ID;
                if !ok {
                    log::warn!("[config] domain id {} out of range, using 0", id);
                }
                ok
            })
            .unwrap_or(defaults.domain_id);

        let backend = env::var(ENV_BACKEND)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.backend);

        let log_level = env::var(ENV_LOG_LEVEL)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.log_level);

        let queue_depth = parse_var::<usize>(ENV_QUEUE_DEPTH)
            .filter(|&depth| depth > 0)
            .unwrap_or(defaults.queue_depth);

        let allocator_budget = parse_var::<usize>(ENV_ALLOCATOR_BUDGET);

        Self {
            backend,
            domain_id,
            log_level,
            queue_depth,
            allocator_budget,
        }
    }

    /// Check if any custom configuration was provided
    #[must_use]
    pub fn is_custom(&self) -> bool {
        *self != Self::default()
    }

    /// Log level as a filter; unknown names fall back to `Info`.
    #[must_use]
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            log::warn!("[config] unknown log level '{}', using info", self.log_level);
            log::LevelFilter::Info
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    // Tests in this module mutate process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_vars(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        let _guard = ENV_LOCK.lock();
        let saved: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();
        for (key, value) in vars {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
        f();
        for (key, value) in saved {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = EnvConfig::default();
        assert_eq!(config.domain_id, 0);
        assert_eq!(config.backend, "intra");
        assert_eq!(config.queue_depth, DEFAULT_QUEUE_DEPTH);
        assert!(config.allocator_budget.is_none());
        assert!(!config.is_custom());
    }

    #[test]
    fn test_domain_id_priority() {
        with_vars(
            &[(ENV_DOMAIN_ID, Some("42")), (ENV_ROS_DOMAIN_ID, Some("99"))],
            || assert_eq!(EnvConfig::from_env().domain_id, 42),
        );
        with_vars(
            &[(ENV_DOMAIN_ID, None), (ENV_ROS_DOMAIN_ID, Some("77"))],
            || assert_eq!(EnvConfig::from_env().domain_id, 77),
        );
    }

    #[test]
    fn test_invalid_values_fall_back() {
        with_vars(
            &[
                (ENV_DOMAIN_ID, Some("not-a-number")),
                (ENV_ROS_DOMAIN_ID, Some("500")),
                (ENV_QUEUE_DEPTH, Some("0")),
                (ENV_ALLOCATOR_BUDGET, Some("-3")),
            ],
            || {
                let config = EnvConfig::from_env();
                assert_eq!(config.domain_id, 0);
                assert_eq!(config.queue_depth, DEFAULT_QUEUE_DEPTH);
                assert_eq!(config.allocator_budget, None);
            },
        );
    }

    #[test]
    fn test_queue_depth_and_budget() {
        with_vars(
            &[
                (ENV_QUEUE_DEPTH, Some("3")),
                (ENV_ALLOCATOR_BUDGET, Some(" 4096 ")),
            ],
            || {
                let config = EnvConfig::from_env();
                assert_eq!(config.queue_depth, 3);
                assert_eq!(config.allocator_budget, Some(4096));
                assert!(config.is_custom());
            },
        );
    }

    #[test]
    fn test_log_level_filter() {
        let mut config = EnvConfig::default();
        assert_eq!(config.log_level_filter(), log::LevelFilter::Info);
        config.log_level = "debug".to_string();
        assert_eq!(config.log_level_filter(), log::LevelFilter::Debug);
        config.log_level = "chatty".to_string();
        assert_eq!(config.log_level_filter(), log::LevelFilter::Info);
    }
}
