//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries a store can hold
    pub max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Expired-entry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Staleness sweep interval in seconds
    pub staleness_interval: u64,
    /// Age in seconds after which managed entries are considered stale
    pub staleness_threshold: u64,
    /// Number of signals the invalidation bus buffers per subscriber
    pub bus_capacity: usize,
    /// Byte quota of the persistent storage medium, None = no medium
    pub storage_quota_bytes: Option<usize>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 10000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Expired-entry sweep frequency in seconds (default: 60)
    /// - `STALENESS_INTERVAL` - Staleness sweep frequency in seconds (default: 60)
    /// - `STALENESS_THRESHOLD` - Staleness age in seconds (default: 300)
    /// - `BUS_CAPACITY` - Invalidation bus buffer size (default: 256)
    /// - `STORAGE_QUOTA_BYTES` - Enables the persistent medium with this quota
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            staleness_interval: env_or("STALENESS_INTERVAL", defaults.staleness_interval),
            staleness_threshold: env_or("STALENESS_THRESHOLD", defaults.staleness_threshold),
            bus_capacity: env_or("BUS_CAPACITY", defaults.bus_capacity),
            storage_quota_bytes: env::var("STORAGE_QUOTA_BYTES")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl: 300,
            server_port: 3000,
            cleanup_interval: 60,
            staleness_interval: 60,
            staleness_threshold: 300,
            bus_capacity: 256,
            storage_quota_bytes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_entries, 10_000);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(config.staleness_threshold, 300);
        assert!(config.storage_quota_bytes.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("MAX_ENTRIES");
        env::remove_var("DEFAULT_TTL");
        env::remove_var("SERVER_PORT");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("STORAGE_QUOTA_BYTES");

        let config = Config::from_env();
        assert_eq!(config.max_entries, 10_000);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60);
        assert!(config.storage_quota_bytes.is_none());
    }

    #[test]
    fn test_env_or_ignores_garbage() {
        env::set_var("CLUB_CACHE_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("CLUB_CACHE_TEST_GARBAGE", 7u64), 7);
        env::remove_var("CLUB_CACHE_TEST_GARBAGE");
    }
}
