//! Store Module
//!
//! The remote key-value operations the cache client is built on, with a
//! pooled Redis backend and an in-memory backend that mimics it.

mod entry;
mod memory;
mod redis_store;

use std::collections::HashMap;

use crate::error::Result;

pub use entry::{StoreEntry, StoreValue};
pub use memory::MemoryStore;
pub use redis_store::{RedisConnectionManager, RedisStore};

/// Longest TTL any backend applies: 100 years. Redis rejects expirations
/// whose absolute time overflows a signed 64-bit millisecond clock.
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Caps a TTL at [`MAX_TTL_SECONDS`].
pub(crate) fn clamp_ttl(seconds: u64) -> u64 {
    seconds.min(MAX_TTL_SECONDS)
}

// == Store Trait ==
/// Raw operations against a key-value store.
///
/// Keys arrive fully namespaced. Every call is one round trip and absent
/// keys or fields are reported as `None`/`false`.
pub trait Store: Send + Sync {
    /// GET
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// SET, clearing any TTL on the key
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// DEL; returns how many keys existed
    fn delete(&self, keys: &[String]) -> Result<u64>;

    /// EXISTS
    fn exists(&self, key: &str) -> Result<bool>;

    /// EXPIRE, capped at `MAX_TTL_SECONDS`; returns false if the key does
    /// not exist
    fn expire(&self, key: &str, seconds: u64) -> Result<bool>;

    /// HSET of a single field
    fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()>;

    /// HGET
    fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>>;

    /// HGETALL
    fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>>;

    /// HEXISTS
    fn hexists(&self, key: &str, field: &str) -> Result<bool>;

    /// Releases the underlying resources. Idempotent; later calls fail.
    fn close(&self);

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
