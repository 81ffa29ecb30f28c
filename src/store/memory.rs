//! Memory Store Module
//!
//! In-process store with Redis semantics for strings, hashes and TTLs.
//! Expired keys are dropped lazily on access and in bulk by the sweeper task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use redis::{ErrorKind, RedisError};
use tracing::debug;

use super::entry::{StoreEntry, StoreValue};
use super::{clamp_ttl, Store};
use crate::error::{CacheError, Result};

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

// == Memory Store ==
/// Thread-safe in-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Key-value storage
    entries: Mutex<HashMap<String, StoreEntry>>,
    /// Set once `close` has been called
    closed: AtomicBool,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    // == Length ==
    /// Returns the number of stored keys, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    // == TTL ==
    /// Remaining lifetime of a key in seconds, `None` if it has no TTL or is absent.
    pub fn ttl(&self, key: &str) -> Option<u64> {
        let mut entries = self.live_entries()?;
        live_entry(&mut entries, key).and_then(|entry| entry.ttl_remaining())
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, StoreEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live_entries(&self) -> Option<MutexGuard<'_, HashMap<String, StoreEntry>>> {
        if self.closed.load(Ordering::Acquire) {
            None
        } else {
            Some(self.entries())
        }
    }

    fn open_entries(&self) -> Result<MutexGuard<'_, HashMap<String, StoreEntry>>> {
        self.live_entries()
            .ok_or_else(|| CacheError::Connection("memory store is closed".to_string()))
    }
}

/// Looks up a key, dropping it first if it has expired.
fn live_entry<'a>(
    entries: &'a mut HashMap<String, StoreEntry>,
    key: &str,
) -> Option<&'a mut StoreEntry> {
    if entries.get(key).is_some_and(StoreEntry::is_expired) {
        entries.remove(key);
        debug!(key, "expired key dropped on access");
    }
    entries.get_mut(key)
}

fn wrong_type() -> CacheError {
    CacheError::Store(RedisError::from((ErrorKind::TypeError, WRONG_TYPE)))
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.open_entries()?;
        match live_entry(&mut entries, key).map(|entry| &entry.value) {
            Some(StoreValue::Bytes(bytes)) => Ok(Some(bytes.clone())),
            Some(StoreValue::Hash(_)) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.open_entries()?;
        entries.insert(
            key.to_string(),
            StoreEntry::new(StoreValue::Bytes(value.to_vec())),
        );
        Ok(())
    }

    fn delete(&self, keys: &[String]) -> Result<u64> {
        let mut entries = self.open_entries()?;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let mut entries = self.open_entries()?;
        Ok(live_entry(&mut entries, key).is_some())
    }

    fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        let mut entries = self.open_entries()?;
        match live_entry(&mut entries, key) {
            Some(entry) => {
                entry.expire_in(clamp_ttl(seconds));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.open_entries()?;
        if live_entry(&mut entries, key).is_none() {
            entries.insert(
                key.to_string(),
                StoreEntry::new(StoreValue::Hash(HashMap::new())),
            );
        }

        match entries.get_mut(key).map(|entry| &mut entry.value) {
            Some(StoreValue::Hash(fields)) => {
                fields.insert(field.to_string(), value.to_vec());
                Ok(())
            }
            _ => Err(wrong_type()),
        }
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.open_entries()?;
        match live_entry(&mut entries, key).map(|entry| &entry.value) {
            Some(StoreValue::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(StoreValue::Bytes(_)) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>> {
        let mut entries = self.open_entries()?;
        match live_entry(&mut entries, key).map(|entry| &entry.value) {
            Some(StoreValue::Hash(fields)) => Ok(fields.clone()),
            Some(StoreValue::Bytes(_)) => Err(wrong_type()),
            None => Ok(HashMap::new()),
        }
    }

    fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        let mut entries = self.open_entries()?;
        match live_entry(&mut entries, key).map(|entry| &entry.value) {
            Some(StoreValue::Hash(fields)) => Ok(fields.contains_key(field)),
            Some(StoreValue::Bytes(_)) => Err(wrong_type()),
            None => Ok(false),
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.entries().clear();
            debug!("memory store closed");
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
