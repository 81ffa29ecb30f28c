//! Shared Client Module
//!
//! Optional process-wide client for code that cannot have one injected.
//! Construction happens on first use; `close_shared` releases the pool.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::info;

use crate::cache::CacheClient;
use crate::config::Config;
use crate::error::Result;

/// Global cache client instance
static SHARED_CLIENT: OnceLock<Arc<CacheClient>> = OnceLock::new();

/// Serializes first-use construction so racing callers build one client.
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Returns the shared client, connecting with `Config::from_env` on first use.
pub fn shared() -> Result<Arc<CacheClient>> {
    shared_or_init(|| CacheClient::connect(&Config::from_env()))
}

/// Returns the shared client, building it with `init` if none exists yet.
///
/// `init` runs at most once per process. If it fails, nothing is stored and
/// the next caller retries.
pub fn shared_or_init<F>(init: F) -> Result<Arc<CacheClient>>
where
    F: FnOnce() -> Result<CacheClient>,
{
    if let Some(client) = SHARED_CLIENT.get() {
        return Ok(Arc::clone(client));
    }

    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(client) = SHARED_CLIENT.get() {
        return Ok(Arc::clone(client));
    }

    let client = Arc::new(init()?);
    let _ = SHARED_CLIENT.set(Arc::clone(&client));
    info!("shared cache client initialized");
    Ok(client)
}

/// Releases the shared client's connections, if it was ever created.
///
/// The instance itself lives until process exit; operations on it fail
/// after this call.
pub fn close_shared() {
    if let Some(client) = SHARED_CLIENT.get() {
        client.close();
    }
}
