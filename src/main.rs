//! envcache-probe - connectivity check for the cache client
//!
//! Connects with the environment configuration and runs one full cache-aside
//! cycle against the store, exiting non-zero if any step fails.

use std::process::ExitCode;
use std::time::Instant;

use anyhow::{bail, Context};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use envcache::{CacheClient, Config};

/// TTL for the probe key; short so an interrupted probe cleans up after itself.
const PROBE_TTL_SECS: u64 = 30;

fn main() -> ExitCode {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "envcache=info,envcache_probe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("probe failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::from_env();
    info!(
        "Configuration loaded: target={}, tier={:?}, site={:?}, pool_max={}, pool_min_idle={}",
        config.redis_url(),
        config.tier_id,
        config.site_id,
        config.pool.max_size,
        config.pool.min_idle
    );

    let started = Instant::now();
    let cache = CacheClient::connect(&config).context("connecting to the store")?;
    let probe_key = format!("envcache-probe:{}", std::process::id());
    info!("Probing with key {}", cache.namespace(&probe_key));

    let mut computed = 0;
    let first: u32 = cache
        .remember(&probe_key, PROBE_TTL_SECS, || {
            computed += 1;
            std::process::id()
        })
        .context("first remember")?;
    let second: u32 = cache
        .remember(&probe_key, PROBE_TTL_SECS, || {
            computed += 1;
            0
        })
        .context("second remember")?;

    if first != second || computed != 1 {
        bail!(
            "cache-aside mismatch: first={}, second={}, computations={}",
            first,
            second,
            computed
        );
    }

    if !cache.exists(&probe_key).context("exists check")? {
        bail!("probe key missing after write");
    }

    cache.delete(&probe_key).context("cleanup")?;
    cache.close();

    info!(
        "Probe succeeded in {} ms, stats: {:?}",
        started.elapsed().as_millis(),
        cache.stats()
    );
    Ok(())
}
