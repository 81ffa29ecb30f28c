//! Cache Module
//!
//! The cache client and its building blocks: payload codec, key namespacing,
//! pending-expiration tracking and read statistics.

pub mod codec;
mod client;
mod namer;
mod pending;
mod shared;
mod stats;


// Re-export public types
pub use client::{CacheClient, Stored};
pub use namer::KeyNamer;
pub use pending::PendingExpirations;
pub use shared::{close_shared, shared, shared_or_init};
pub use stats::{CacheStats, StatsRecorder};
