//! Cache Client Module
//!
//! Namespaced get/set/hash operations, TTL chaining and cache-aside over any
//! [`Store`] backend.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{codec, CacheStats, KeyNamer, PendingExpirations, StatsRecorder};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::store::{RedisStore, Store};

// == Stored Handle ==
/// Receipt of a write, carrying the namespaced key that was written.
///
/// `expire` targets exactly this key, independent of what other threads
/// have written through the same client since.
#[derive(Debug)]
pub struct Stored<'a> {
    client: &'a CacheClient,
    key: String,
}

impl<'a> Stored<'a> {
    /// The fully-qualified key that was written.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Applies a TTL to the written key.
    ///
    /// The key leaves the pending-expiration buffer wherever it sits, so a
    /// later `expires` does not override this TTL.
    pub fn expire(self, seconds: u64) -> Result<&'a CacheClient> {
        self.client.store.expire(&self.key, seconds)?;
        self.client.pending.remove(&self.key);
        debug!(key = %self.key, seconds, "ttl applied");
        Ok(self.client)
    }
}

// == Cache Client ==
/// Caching façade over a key-value store.
///
/// Every logical key is lower-cased and prefixed with the environment
/// namespace before it reaches the store.
pub struct CacheClient {
    store: Arc<dyn Store>,
    namer: KeyNamer,
    pending: PendingExpirations,
    stats: StatsRecorder,
}

impl CacheClient {
    // == Constructors ==
    /// Connects to Redis with a bounded, health-checked pool.
    pub fn connect(config: &Config) -> Result<Self> {
        let store = RedisStore::connect(config)?;
        let namer = KeyNamer::new(config.tier_id.as_deref(), config.site_id.as_deref());
        Ok(Self::with_store(Arc::new(store), namer))
    }

    /// Builds a client over an existing store.
    pub fn with_store(store: Arc<dyn Store>, namer: KeyNamer) -> Self {
        if namer.is_namespaced() {
            info!(backend = store.backend_name(), prefix = namer.prefix(), "cache client ready");
        } else {
            warn!(
                backend = store.backend_name(),
                "cache client has no environment namespace; keys are shared across environments"
            );
        }

        Self {
            store,
            namer,
            pending: PendingExpirations::new(),
            stats: StatsRecorder::new(),
        }
    }

    /// Returns the store key a logical key maps to.
    pub fn namespace(&self, key: &str) -> String {
        self.namer.namespace(key)
    }

    // == Writes ==
    /// Stores a string verbatim, without encoding.
    pub fn set_str(&self, key: &str, value: &str) -> Result<Stored<'_>> {
        let key = self.namer.namespace(key);
        self.store.set(&key, value.as_bytes())?;
        Ok(self.track(key))
    }

    /// Encodes and stores any serializable value.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<Stored<'_>> {
        let key = self.write(key, value)?;
        Ok(self.track(key))
    }

    /// Writes every field of `fields` into the hash at `key`, each encoded on
    /// its own.
    ///
    /// Fields are written one at a time: if a field fails to encode, the
    /// fields before it stay written and the error is returned. The hash key
    /// is recorded for `expires` only after all fields succeed.
    pub fn set_hash<I, K, V>(&self, key: &str, fields: I) -> Result<Stored<'_>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        let key = self.namer.namespace(key);
        for (field, value) in fields {
            let payload = codec::encode(&value)?;
            self.store.hset(&key, field.as_ref(), &payload)?;
        }
        Ok(self.track(key))
    }

    // == Delete ==
    /// Removes a key. If it is the most recent pending write, it leaves the
    /// pending-expiration buffer too.
    pub fn delete(&self, key: &str) -> Result<()> {
        let key = self.namer.namespace(key);
        self.store.delete(std::slice::from_ref(&key))?;
        self.pending.pop_if_top(&key);
        Ok(())
    }

    /// Deletes many keys at once. The pending-expiration buffer is untouched.
    ///
    /// Returns how many of the keys existed.
    pub fn clear_keys<K: AsRef<str>>(&self, keys: &[K]) -> Result<u64> {
        let keys: Vec<String> = keys
            .iter()
            .map(|key| self.namer.namespace(key.as_ref()))
            .collect();
        self.store.delete(&keys)
    }

    // == Reads ==
    /// Reads a string stored with `set_str`. A missing key is `None`.
    ///
    /// The bytes are returned as stored; invalid UTF-8, such as an encoded
    /// payload written by `set`, is replaced with U+FFFD.
    pub fn get_str(&self, key: &str) -> Result<Option<String>> {
        let key = self.namer.namespace(key);
        Ok(self
            .store
            .get(&key)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Reads and decodes a value.
    ///
    /// Missing keys, payloads of another shape and undecodable payloads all
    /// read as `None`; only store failures are errors.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let key = self.namer.namespace(key);
        let bytes = self.store.get(&key)?;
        Ok(self.decode_cached(&key, bytes))
    }

    /// True if the key exists.
    pub fn exists(&self, key: &str) -> Result<bool> {
        self.store.exists(&self.namer.namespace(key))
    }

    /// Reads and decodes every field of a hash. A missing hash is empty.
    ///
    /// Unlike the write path, a single undecodable field fails the whole read.
    pub fn get_hash<T: DeserializeOwned>(&self, key: &str) -> Result<HashMap<String, T>> {
        let key = self.namer.namespace(key);
        let mut decoded = HashMap::new();

        for (field, bytes) in self.store.hgetall(&key)? {
            let value = codec::decode(&bytes)
                .map_err(|e| {
                    CacheError::Deserialization(format!("{} field {}: {}", key, field, e))
                })?
                .ok_or_else(|| {
                    CacheError::Deserialization(format!("{} field {} is empty", key, field))
                })?;
            decoded.insert(field, value);
        }

        Ok(decoded)
    }

    /// Reads one hash field. `None` means the field does not exist.
    pub fn get_hash_field<T: DeserializeOwned>(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<T>> {
        let key = self.namer.namespace(key);
        match self.store.hget(&key, field)? {
            Some(bytes) => codec::decode(&bytes),
            None => Ok(None),
        }
    }

    /// True if `field` exists in the hash at `key`.
    pub fn is_member_of_hash(&self, key: &str, field: &str) -> Result<bool> {
        self.store.hexists(&self.namer.namespace(key), field)
    }

    // == Expiration ==
    /// Applies a TTL to the most recent write still pending.
    ///
    /// With nothing pending this is a no-op, so chained calls stay safe.
    pub fn expires(&self, seconds: u64) -> Result<&Self> {
        let Some(key) = self.pending.top() else {
            debug!(seconds, "expires called with no pending write");
            return Ok(self);
        };

        self.store.expire(&key, seconds)?;
        self.pending.pop_if_top(&key);
        debug!(key = %key, seconds, "ttl applied to pending write");
        Ok(self)
    }

    /// Number of writes still waiting for an `expires` call.
    pub fn pending_expirations(&self) -> usize {
        self.pending.len()
    }

    // == Cache-Aside ==
    /// Returns the cached value for `key`, or computes, stores and expires it.
    ///
    /// `compute` runs at most once and only on a miss. A store that cannot be
    /// read or written degrades to computing every time; encoding the
    /// computed value must succeed. If the TTL cannot be applied the written
    /// value is deleted again. The pending-expiration buffer is untouched.
    pub fn remember<T, F>(&self, key: &str, ttl_seconds: u64, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.try_remember(key, ttl_seconds, || Ok::<T, CacheError>(compute()))
    }

    /// Like [`remember`](Self::remember) for a fallible computation. The
    /// computation's error is returned unchanged.
    pub fn try_remember<T, E, F>(
        &self,
        key: &str,
        ttl_seconds: u64,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let namespaced = self.namer.namespace(key);

        match self.store.get(&namespaced) {
            Ok(bytes) => {
                if let Some(value) = self.decode_cached(&namespaced, bytes) {
                    return Ok(value);
                }
            }
            Err(e) => {
                self.stats.record_miss();
                warn!(key = %namespaced, error = %e, "cache read failed, computing value");
            }
        }

        let value = compute()?;

        match self.write(key, &value) {
            Ok(_) => {}
            Err(e) if e.is_store_failure() => {
                warn!(key = %namespaced, error = %e, "cache write-back failed");
                return Ok(value);
            }
            Err(e) => return Err(e.into()),
        }

        // Without a TTL the value would be served forever, so drop it.
        if let Err(e) = self.store.expire(&namespaced, ttl_seconds) {
            warn!(key = %namespaced, error = %e, "ttl not applied, discarding cached value");
            if let Err(e) = self.store.delete(std::slice::from_ref(&namespaced)) {
                warn!(key = %namespaced, error = %e, "cached value left without ttl");
            }
        }

        Ok(value)
    }

    // == Lifecycle ==
    /// Read statistics since the client was created.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Releases the store's connections. Idempotent; later operations fail
    /// with `CacheError::Connection`.
    pub fn close(&self) {
        self.store.close();
    }

    /// Encodes and stores a value without touching the pending buffer.
    /// Returns the namespaced key.
    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<String> {
        let payload = codec::encode(value)?;
        let key = self.namer.namespace(key);
        self.store.set(&key, &payload)?;
        Ok(key)
    }

    fn track(&self, key: String) -> Stored<'_> {
        self.pending.push(key.clone());
        Stored { client: self, key }
    }

    /// Decodes a cached payload, counting hits and misses. Empty or
    /// undecodable payloads are misses.
    fn decode_cached<T: DeserializeOwned>(&self, key: &str, bytes: Option<Vec<u8>>) -> Option<T> {
        let Some(bytes) = bytes.filter(|b| !b.is_empty()) else {
            self.stats.record_miss();
            return None;
        };

        match codec::decode(&bytes) {
            Ok(Some(value)) => {
                self.stats.record_hit();
                Some(value)
            }
            Ok(None) => {
                self.stats.record_miss();
                None
            }
            Err(e) => {
                self.stats.record_decode_failure();
                debug!(key, error = %e, "cached payload unusable, treating as miss");
                None
            }
        }
    }
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("backend", &self.store.backend_name())
            .field("namer", &self.namer)
            .field("pending", &self.pending.len())
            .finish()
    }
}
