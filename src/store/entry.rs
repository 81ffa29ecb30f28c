//! Store Entry Module
//!
//! Defines the in-memory representation of a stored key with TTL support.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

// == Store Value ==
/// The two value types the cache client writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreValue {
    /// Plain string or encoded payload
    Bytes(Vec<u8>),
    /// Hash of independently encoded fields
    Hash(HashMap<String, Vec<u8>>),
}

// == Store Entry ==
/// A stored value and its expiration metadata.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// The stored value
    pub value: StoreValue,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoreEntry {
    // == Constructor ==
    /// Creates an entry without expiration. Keys only gain a TTL through an
    /// explicit EXPIRE.
    pub fn new(value: StoreValue) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches the expiration
    /// time, so a zero-second TTL expires immediately.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Expire ==
    /// Sets the entry to expire `ttl_seconds` from now.
    pub fn expire_in(&mut self, ttl_seconds: u64) {
        let ttl_ms = ttl_seconds.saturating_mul(1000);
        self.expires_at = Some(current_timestamp_ms().saturating_add(ttl_ms));
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired (TTL elapsed)
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    /// Returns remaining TTL in seconds, or None if no expiration is set.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.ttl_remaining_ms().map(|ms| ms / 1000)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
