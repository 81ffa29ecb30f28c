//! Pending Expiration Module
//!
//! Remembers the most recently written keys so a trailing `expires` call can
//! apply a TTL without repeating the key.

use std::sync::{Mutex, MutexGuard, PoisonError};

// == Pending Expirations ==
/// LIFO of namespaced keys awaiting a TTL.
///
/// `expires` and `delete` only inspect the top entry. Threads sharing one
/// client race on the top entry; the explicit `Stored` handle avoids that.
#[derive(Debug, Default)]
pub struct PendingExpirations {
    stack: Mutex<Vec<String>>,
}

impl PendingExpirations {
    // == Constructor ==
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push ==
    /// Records a freshly written key on top of the stack.
    pub fn push(&self, key: String) {
        self.lock().push(key);
    }

    // == Top ==
    /// Returns the key the next `expires` call would target.
    pub fn top(&self) -> Option<String> {
        self.lock().last().cloned()
    }

    // == Pop If Top ==
    /// Pops the top entry if it equals `key`. Entries below the top are
    /// never searched.
    ///
    /// Returns true if an entry was removed.
    pub fn pop_if_top(&self, key: &str) -> bool {
        let mut stack = self.lock();
        if stack.last().map(String::as_str) == Some(key) {
            stack.pop();
            true
        } else {
            false
        }
    }

    // == Remove ==
    /// Removes the most recent entry for `key`, wherever it sits.
    ///
    /// Used once a key's TTL has been applied through its own handle, so a
    /// later `expires` cannot target it again.
    pub fn remove(&self, key: &str) -> bool {
        let mut stack = self.lock();
        match stack.iter().rposition(|pending| pending == key) {
            Some(index) => {
                stack.remove(index);
                true
            }
            None => false,
        }
    }

    // == Length ==
    /// Number of keys still waiting for a TTL.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // A Vec<String> cannot be left half-updated, so a poisoned lock is still usable.
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_new() {
        let pending = PendingExpirations::new();
        assert!(pending.is_empty());
        assert_eq!(pending.top(), None);
    }

    #[test]
    fn test_push_keeps_older_entries() {
        let pending = PendingExpirations::new();

        pending.push("a".to_string());
        pending.push("b".to_string());

        assert_eq!(pending.len(), 2);
        assert_eq!(pending.top(), Some("b".to_string()));

        assert!(pending.pop_if_top("b"));
        assert_eq!(pending.top(), Some("a".to_string()));
    }

    #[test]
    fn test_pop_if_top_ignores_lower_entries() {
        let pending = PendingExpirations::new();

        pending.push("a".to_string());
        pending.push("b".to_string());

        assert!(!pending.pop_if_top("a"));
        assert_eq!(pending.len(), 2);
        assert_eq!(pending.top(), Some("b".to_string()));
    }

    #[test]
    fn test_pop_if_top_on_empty() {
        let pending = PendingExpirations::new();
        assert!(!pending.pop_if_top("a"));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_remove_takes_most_recent_entry_below_top() {
        let pending = PendingExpirations::new();

        pending.push("a".to_string());
        pending.push("x".to_string());
        pending.push("a".to_string());
        pending.push("b".to_string());

        assert!(pending.remove("a"));
        assert_eq!(pending.len(), 3);
        assert_eq!(pending.top(), Some("b".to_string()));

        assert!(pending.pop_if_top("b"));
        assert_eq!(pending.top(), Some("x".to_string()));
        assert!(!pending.remove("missing"));
    }

    #[test]
    fn test_same_key_pushed_twice() {
        let pending = PendingExpirations::new();

        pending.push("a".to_string());
        pending.push("a".to_string());

        assert!(pending.pop_if_top("a"));
        assert_eq!(pending.top(), Some("a".to_string()));
    }
}
