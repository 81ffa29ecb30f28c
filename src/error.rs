//! Error types for the cache client
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache client.
///
/// Missing keys are never reported through this type; they surface as
/// `None` or `false` from the read operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Pool construction failed, acquisition timed out, or the client is closed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A command failed at the driver level (I/O, timeout, wrong type)
    #[error("Store operation failed: {0}")]
    Store(#[from] redis::RedisError),

    /// A value could not be encoded for storage
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A stored payload could not be decoded
    #[error("Deserialization failed: {0}")]
    Deserialization(String),
}

impl From<r2d2::Error> for CacheError {
    fn from(err: r2d2::Error) -> Self {
        CacheError::Connection(err.to_string())
    }
}

impl CacheError {
    /// Returns true for failures of the remote store itself, as opposed to
    /// codec failures on the caller's data.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, CacheError::Connection(_) | CacheError::Store(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache client.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_classification() {
        assert!(CacheError::Connection("refused".to_string()).is_store_failure());
        let redis_err = redis::RedisError::from((redis::ErrorKind::TypeError, "WRONGTYPE"));
        assert!(CacheError::from(redis_err).is_store_failure());
        assert!(!CacheError::Serialization("bad".to_string()).is_store_failure());
        assert!(!CacheError::Deserialization("bad".to_string()).is_store_failure());
    }

    #[test]
    fn test_error_messages() {
        let err = CacheError::Connection("pool exhausted".to_string());
        assert_eq!(err.to_string(), "Connection failed: pool exhausted");
    }
}
