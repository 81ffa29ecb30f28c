//! envcache - Environment-scoped caching client
//!
//! Wraps a Redis store with per-environment key namespacing, compressed
//! value encoding, hash storage, TTL chaining and a cache-aside helper.
//!
//! ```ignore
//! use envcache::{CacheClient, Config};
//!
//! let cache = CacheClient::connect(&Config::from_env())?;
//! cache.set("user:1", &profile)?.expire(300)?;
//! let total: u64 = cache.remember("report:total", 60, || expensive_total())?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod store;
pub mod tasks;

pub use cache::{CacheClient, CacheStats, KeyNamer, Stored};
pub use config::{Config, PoolConfig};
pub use error::{CacheError, Result};
pub use store::{MemoryStore, RedisStore, Store, MAX_TTL_SECONDS};
pub use tasks::spawn_sweeper;
