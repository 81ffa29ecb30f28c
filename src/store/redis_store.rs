//! Redis Store Module
//!
//! Pooled Redis backend. Connections are validated with PING when borrowed
//! and checked for liveness when returned; every operation holds a
//! connection for exactly one round trip.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use r2d2::{HandleError, ManageConnection, Pool, PooledConnection};
use redis::{Client, Connection, ConnectionLike, RedisError, RedisResult};
use tracing::{debug, info, warn};

use super::{clamp_ttl, Store};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Connection Manager ==
/// r2d2 manager producing health-checked Redis connections.
#[derive(Debug, Clone)]
pub struct RedisConnectionManager {
    client: Client,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RedisConnectionManager {
    /// Creates a manager for the configured target.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::open(config.redis_url()).map_err(|e| {
            CacheError::Connection(format!("invalid redis target {}: {}", config.redis_url(), e))
        })?;

        Ok(Self {
            client,
            connect_timeout: config.pool.connection_timeout,
            command_timeout: config.pool.command_timeout,
        })
    }
}

impl ManageConnection for RedisConnectionManager {
    type Connection = Connection;
    type Error = RedisError;

    fn connect(&self) -> RedisResult<Connection> {
        let conn = self.client.get_connection_with_timeout(self.connect_timeout)?;
        conn.set_read_timeout(Some(self.command_timeout))?;
        conn.set_write_timeout(Some(self.command_timeout))?;
        Ok(conn)
    }

    // Runs on every checkout.
    fn is_valid(&self, conn: &mut Connection) -> RedisResult<()> {
        redis::cmd("PING").query::<String>(conn).map(|_| ())
    }

    // Runs synchronously on every return and must not block, so no PING here.
    // Connections that failed an I/O call report closed and are dropped; one
    // that died while idle is caught by the PING on its next checkout.
    fn has_broken(&self, conn: &mut Connection) -> bool {
        !conn.is_open()
    }
}

/// Routes pool-level connection errors into tracing.
#[derive(Debug, Clone, Copy)]
struct TracingErrorHandler;

impl HandleError<RedisError> for TracingErrorHandler {
    fn handle_error(&self, error: RedisError) {
        warn!(error = %error, "redis pool connection error");
    }
}

// == Redis Store ==
/// Redis-backed store with a bounded connection pool.
pub struct RedisStore {
    pool: RwLock<Option<Pool<RedisConnectionManager>>>,
    target: String,
}

impl RedisStore {
    // == Constructor ==
    /// Builds the pool and establishes its initial connections.
    ///
    /// Fails with `CacheError::Connection` if the pool settings are
    /// inconsistent or the store cannot be reached within the timeout.
    pub fn connect(config: &Config) -> Result<Self> {
        let pool_config = &config.pool;
        if pool_config.max_size == 0 || pool_config.min_idle > pool_config.max_size {
            return Err(CacheError::Connection(format!(
                "invalid pool sizing: max_size={}, min_idle={}",
                pool_config.max_size, pool_config.min_idle
            )));
        }

        let manager = RedisConnectionManager::new(config)?;
        let pool = Pool::builder()
            .max_size(pool_config.max_size)
            .min_idle(Some(pool_config.min_idle))
            .idle_timeout(Some(pool_config.idle_timeout))
            .connection_timeout(pool_config.connection_timeout)
            .test_on_check_out(true)
            .error_handler(Box::new(TracingErrorHandler))
            .build(manager)
            .map_err(|e| {
                CacheError::Connection(format!(
                    "failed to connect to redis at {}: {}",
                    config.redis_url(),
                    e
                ))
            })?;

        info!(
            target_url = %config.redis_url(),
            max_size = pool_config.max_size,
            min_idle = pool_config.min_idle,
            "redis pool ready"
        );

        Ok(Self {
            pool: RwLock::new(Some(pool)),
            target: config.redis_url(),
        })
    }

    /// Connections currently open and idle, or `None` once closed.
    pub fn pool_state(&self) -> Option<(u32, u32)> {
        self.current_pool().map(|pool| {
            let state = pool.state();
            (state.connections, state.idle_connections)
        })
    }

    fn current_pool(&self) -> Option<Pool<RedisConnectionManager>> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn acquire(&self) -> Result<PooledConnection<RedisConnectionManager>> {
        let pool = self
            .current_pool()
            .ok_or_else(|| CacheError::Connection("redis store is closed".to_string()))?;
        Ok(pool.get()?)
    }

    /// Borrows a connection for one round trip; it returns to the pool when
    /// the guard drops, on success and on error alike.
    fn round_trip<T>(
        &self,
        command: &'static str,
        key: &str,
        op: impl FnOnce(&mut Connection) -> RedisResult<T>,
    ) -> Result<T> {
        let started = Instant::now();
        let mut conn = self.acquire()?;
        let result = op(&mut conn);

        debug!(
            command,
            key,
            elapsed_us = started.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "redis round trip"
        );
        Ok(result?)
    }
}

impl Store for RedisStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.round_trip("GET", key, |conn| redis::cmd("GET").arg(key).query(conn))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.round_trip("SET", key, |conn| {
            redis::cmd("SET").arg(key).arg(value).query(conn)
        })
    }

    fn delete(&self, keys: &[String]) -> Result<u64> {
        let Some(first) = keys.first() else {
            return Ok(0);
        };
        self.round_trip("DEL", first, |conn| redis::cmd("DEL").arg(keys).query(conn))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.round_trip("EXISTS", key, |conn| {
            redis::cmd("EXISTS").arg(key).query(conn)
        })
    }

    fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        let seconds = clamp_ttl(seconds);
        self.round_trip("EXPIRE", key, |conn| {
            redis::cmd("EXPIRE").arg(key).arg(seconds).query(conn)
        })
    }

    fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        self.round_trip("HSET", key, |conn| {
            redis::cmd("HSET").arg(key).arg(field).arg(value).query(conn)
        })
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        self.round_trip("HGET", key, |conn| {
            redis::cmd("HGET").arg(key).arg(field).query(conn)
        })
    }

    fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>> {
        self.round_trip("HGETALL", key, |conn| {
            redis::cmd("HGETALL").arg(key).query(conn)
        })
    }

    fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        self.round_trip("HEXISTS", key, |conn| {
            redis::cmd("HEXISTS").arg(key).arg(field).query(conn)
        })
    }

    fn close(&self) {
        let released = self
            .pool
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if released.is_some() {
            info!(target_url = %self.target, "redis pool released");
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("target", &self.target)
            .field("pool_state", &self.pool_state())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;

    fn unreachable_config() -> Config {
        // Port 1 is reserved and refuses connections on loopback.
        let mut config = Config::new("127.0.0.1", 1);
        config.pool = PoolConfig {
            connection_timeout: Duration::from_millis(300),
            ..PoolConfig::default()
        };
        config
    }

    #[test]
    fn test_manager_accepts_config_target() {
        let manager = RedisConnectionManager::new(&Config::default()).unwrap();
        assert_eq!(manager.command_timeout, PoolConfig::default().command_timeout);
    }

    #[test]
    fn test_connect_unreachable_fails_with_connection_error() {
        let result = RedisStore::connect(&unreachable_config());
        assert!(matches!(result, Err(CacheError::Connection(_))));
    }

    #[test]
    fn test_connect_rejects_inconsistent_pool_sizing() {
        let mut config = unreachable_config();
        config.pool.max_size = 2;
        config.pool.min_idle = 5;

        match RedisStore::connect(&config) {
            Err(CacheError::Connection(msg)) => assert!(msg.contains("invalid pool sizing")),
            other => panic!("expected pool sizing error, got {:?}", other.map(|_| ())),
        }
    }
}
