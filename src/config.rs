//! Configuration Module
//!
//! Connection target, environment identity and pool sizing for the cache client.

use std::env;
use std::time::Duration;

/// Default Redis host when no override is present.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default Redis port when no override is present.
pub const DEFAULT_PORT: u16 = 6379;

// == Pool Config ==
/// Sizing and timeouts for the connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of connections, idle or in use
    pub max_size: u32,
    /// Idle connections the pool keeps warm
    pub min_idle: u32,
    /// How long `acquire` waits before failing
    pub connection_timeout: Duration,
    /// Idle connections above `min_idle` are closed after this long
    pub idle_timeout: Duration,
    /// Read/write timeout applied to every round trip
    pub command_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_idle: 1,
            connection_timeout: Duration::from_millis(2000),
            idle_timeout: Duration::from_secs(60),
            command_timeout: Duration::from_millis(2000),
        }
    }
}

// == Config ==
/// Cache client configuration.
///
/// The recognized options are enumerable: host, port, tier id, site id and
/// the pool settings. Identifiers left as `None` disable key namespacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Redis host
    pub host: String,
    /// Redis port
    pub port: u16,
    /// Deployment tier (e.g. "production")
    pub tier_id: Option<String>,
    /// Site or environment identifier
    pub site_id: Option<String>,
    /// Connection pool settings
    pub pool: PoolConfig,
}

impl Config {
    /// Creates a config for the given target with no namespace identifiers.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tier_id: None,
            site_id: None,
            pool: PoolConfig::default(),
        }
    }

    /// Sets both namespace identifiers.
    pub fn with_namespace(mut self, tier_id: impl Into<String>, site_id: impl Into<String>) -> Self {
        self.tier_id = Some(tier_id.into());
        self.site_id = Some(site_id.into());
        self
    }

    /// Loads configuration from the environment with the stock defaults.
    pub fn from_env() -> Self {
        Self::from_env_or(DEFAULT_HOST, DEFAULT_PORT)
    }

    /// Loads configuration from environment variables, falling back to the
    /// supplied host and port.
    ///
    /// # Environment Variables
    /// - `REDIS_HOST` - Store host (empty is ignored)
    /// - `REDIS_PORT` - Store port (malformed falls back to `default_port`)
    /// - `ENV` - Deployment tier identifier
    /// - `SITE_ENV` - Site identifier
    /// - `REDIS_POOL_MAX_SIZE` - Maximum connections (default: 10)
    /// - `REDIS_POOL_MIN_IDLE` - Minimum idle connections (default: 1)
    /// - `REDIS_POOL_TIMEOUT_MS` - Acquisition timeout (default: 2000)
    /// - `REDIS_POOL_IDLE_TIMEOUT_SECS` - Surplus idle lifetime (default: 60)
    /// - `REDIS_COMMAND_TIMEOUT_MS` - Per round trip timeout (default: 2000)
    pub fn from_env_or(default_host: &str, default_port: u16) -> Self {
        let defaults = PoolConfig::default();

        Self {
            host: non_empty_var("REDIS_HOST").unwrap_or_else(|| default_host.to_string()),
            port: parsed_var("REDIS_PORT").unwrap_or(default_port),
            tier_id: non_empty_var("ENV"),
            site_id: non_empty_var("SITE_ENV"),
            pool: PoolConfig {
                max_size: parsed_var("REDIS_POOL_MAX_SIZE").unwrap_or(defaults.max_size),
                min_idle: parsed_var("REDIS_POOL_MIN_IDLE").unwrap_or(defaults.min_idle),
                connection_timeout: parsed_var("REDIS_POOL_TIMEOUT_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.connection_timeout),
                idle_timeout: parsed_var("REDIS_POOL_IDLE_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.idle_timeout),
                command_timeout: parsed_var("REDIS_COMMAND_TIMEOUT_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.command_timeout),
            },
        }
    }

    /// Connection URL understood by the redis driver.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 6379);
        assert!(config.tier_id.is_none());
        assert!(config.site_id.is_none());
        assert_eq!(config.pool.max_size, 10);
        assert_eq!(config.pool.min_idle, 1);
    }

    #[test]
    fn test_redis_url() {
        let config = Config::new("cache.internal", 6380);
        assert_eq!(config.redis_url(), "redis://cache.internal:6380/");
    }

    #[test]
    fn test_with_namespace() {
        let config = Config::default().with_namespace("Prod", "EU");
        assert_eq!(config.tier_id.as_deref(), Some("Prod"));
        assert_eq!(config.site_id.as_deref(), Some("EU"));
    }

    // All environment assertions live in one test so parallel tests never
    // observe each other's variables.
    #[test]
    fn test_config_from_env() {
        for name in ["REDIS_HOST", "REDIS_PORT", "ENV", "SITE_ENV", "REDIS_POOL_MAX_SIZE"] {
            env::remove_var(name);
        }

        let config = Config::from_env_or("fallback", 7000);
        assert_eq!(config.host, "fallback");
        assert_eq!(config.port, 7000);
        assert!(config.tier_id.is_none());

        env::set_var("REDIS_HOST", "redis.local");
        env::set_var("REDIS_PORT", "6390");
        env::set_var("ENV", "Staging");
        env::set_var("SITE_ENV", "US");
        env::set_var("REDIS_POOL_MAX_SIZE", "4");
        let config = Config::from_env_or("fallback", 7000);
        assert_eq!(config.host, "redis.local");
        assert_eq!(config.port, 6390);
        assert_eq!(config.tier_id.as_deref(), Some("Staging"));
        assert_eq!(config.site_id.as_deref(), Some("US"));
        assert_eq!(config.pool.max_size, 4);

        env::set_var("REDIS_PORT", "not-a-port");
        env::set_var("REDIS_HOST", "");
        let config = Config::from_env_or("fallback", 7000);
        assert_eq!(config.port, 7000);
        assert_eq!(config.host, "fallback");

        for name in ["REDIS_HOST", "REDIS_PORT", "ENV", "SITE_ENV", "REDIS_POOL_MAX_SIZE"] {
            env::remove_var(name);
        }
    }
}
