//! TTL cache for feed-based calendar providers.
//!
//! Entries are keyed by account id. A refresh that fails while a previous
//! payload exists serves that payload as [`Freshness::Stale`] instead of
//! failing the read.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::Result;

/// Per-account config key overriding the provider's default TTL.
pub const CACHE_TTL_KEY: &str = "cache_ttl_secs";

/// How a cached payload was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Served from cache, within TTL.
    Fresh,
    /// Fetched by this call.
    Refreshed,
    /// Refresh failed; the previous payload was served.
    Stale,
}

/// A payload returned by [`FeedCache::get_or_fetch`].
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub payload: Arc<T>,
    pub freshness: Freshness,
    /// Wall-clock time of the fetch that produced `payload`.
    pub fetched_at: DateTime<Utc>,
}

struct CacheEntry<T> {
    payload: Arc<T>,
    fetched_at: Instant,
    fetched_at_utc: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn cached(&self, freshness: Freshness) -> Cached<T> {
        Cached {
            payload: Arc::clone(&self.payload),
            freshness,
            fetched_at: self.fetched_at_utc,
        }
    }
}

/// Per-account TTL cache with stale fallback.
///
/// The lock is never held across a fetch, so two concurrent refreshes of the
/// same account may both hit the source; the last one to finish wins.
pub struct FeedCache<T> {
    provider: &'static str,
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T: Send + Sync> FeedCache<T> {
    /// `provider` only prefixes log lines.
    pub fn new(provider: &'static str) -> Self {
        Self {
            provider,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached payload for `account_id`, fetching it when absent or older than `ttl`.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        account_id: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Cached<T>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let key = account_id.to_ascii_lowercase();

        let previous = {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if entry.fetched_at.elapsed() < ttl => {
                    return Ok(entry.cached(Freshness::Fresh));
                }
                Some(entry) => Some(entry.cached(Freshness::Stale)),
                None => None,
            }
        };

        match fetch().await {
            Ok(value) => {
                let entry = CacheEntry {
                    payload: Arc::new(value),
                    fetched_at: Instant::now(),
                    fetched_at_utc: Utc::now(),
                };
                let cached = entry.cached(Freshness::Refreshed);
                self.entries.write().await.insert(key, entry);
                log::debug!("[{}] Refreshed feed for account '{account_id}'", self.provider);
                Ok(cached)
            }
            Err(e) => match previous {
                Some(stale) => {
                    log::warn!(
                        "[{}] Refresh failed for account '{account_id}', serving copy fetched at {}: {e}",
                        self.provider,
                        stale.fetched_at
                    );
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    /// Drop the entry for `account_id`.
    pub async fn invalidate(&self, account_id: &str) {
        self.entries
            .write()
            .await
            .remove(&account_id.to_ascii_lowercase());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Read the TTL override from an account's config bag.
///
/// Absent, non-numeric and zero values fall back to `default`.
pub fn ttl_from_config(config: &BTreeMap<String, String>, default: Duration) -> Duration {
    config
        .get(CACHE_TTL_KEY)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map_or(default, Duration::from_secs)
}
