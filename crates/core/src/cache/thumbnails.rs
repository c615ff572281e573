//! Thumbnail cache over a `DurableStore`.
//!
//! Entries are JSON objects stored under [`compute_cache_key`]. An entry is
//! served for [`CACHE_TTL`] after it was written; past that, or if it fails to
//! parse, it is deleted on the next access. Store failures are logged and
//! reported as misses so a broken store only costs a refetch.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::hash::{compute_cache_key, is_cache_key};
use super::store::DurableStore;

/// Fixed lifetime of a cache entry.
pub const CACHE_TTL: Duration = Duration::from_secs(10 * 24 * 60 * 60);

/// Hosts that serve their own thumbnails efficiently; never duplicated locally.
static ALWAYS_FRESH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)imgur").expect("valid regex"));

/// A displayable payload: inline bytes as a data URI, or a URL to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    DataUri(String),
    Url(String),
}

impl Payload {
    /// The string an image element would use as its source.
    pub fn as_src(&self) -> &str {
        match self {
            Payload::DataUri(s) | Payload::Url(s) => s,
        }
    }

    pub fn into_src(self) -> String {
        match self {
            Payload::DataUri(s) | Payload::Url(s) => s,
        }
    }
}

/// Stored representation of a cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Write time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub original_url: String,
}

impl CacheEntry {
    pub fn new(url: &str, payload: &Payload, written_at_ms: i64) -> Self {
        let (base64_data, image_url) = match payload {
            Payload::DataUri(data) => (Some(data.clone()), None),
            Payload::Url(u) => (None, Some(u.clone())),
        };
        Self { base64_data, image_url, timestamp: Some(written_at_ms), original_url: url.to_string() }
    }

    /// Whether the entry is older than the TTL at `now_ms`. Entries without a
    /// timestamp are always expired.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.timestamp {
            Some(ts) => now_ms.saturating_sub(ts) > CACHE_TTL.as_millis() as i64,
            None => true,
        }
    }

    fn payload(&self) -> Option<Payload> {
        self.base64_data
            .clone()
            .map(Payload::DataUri)
            .or_else(|| self.image_url.clone().map(Payload::Url))
    }
}

/// Why a lookup produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// No entry under the key.
    Absent,
    /// Entry past its TTL; it has been evicted.
    Expired,
    /// Entry could not be parsed or held no payload; it has been evicted.
    Corrupt,
    /// The store itself failed.
    Unavailable,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Payload),
    Miss(MissReason),
}

impl CacheLookup {
    pub fn into_payload(self) -> Option<Payload> {
        match self {
            CacheLookup::Hit(payload) => Some(payload),
            CacheLookup::Miss(_) => None,
        }
    }
}

/// Durable cache of resolved thumbnails keyed by source URL.
#[derive(Clone)]
pub struct ThumbnailCache {
    store: Arc<dyn DurableStore>,
}

impl std::fmt::Debug for ThumbnailCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailCache").finish_non_exhaustive()
    }
}

impl ThumbnailCache {
    /// Wrap a store and sweep stale entries once before handing it out.
    pub async fn open(store: Arc<dyn DurableStore>) -> Self {
        let cache = Self { store };
        let evicted = cache.sweep().await;
        if evicted > 0 {
            tracing::info!(evicted, "swept stale thumbnail cache entries");
        }
        cache
    }

    /// Whether `url` is excluded from caching.
    pub fn is_always_fresh(url: &str) -> bool {
        ALWAYS_FRESH.is_match(url)
    }

    /// Look up `url`, evicting the entry if it is stale or unreadable.
    pub async fn lookup(&self, url: &str) -> CacheLookup {
        self.lookup_at(url, chrono::Utc::now().timestamp_millis()).await
    }

    async fn lookup_at(&self, url: &str, now_ms: i64) -> CacheLookup {
        let key = compute_cache_key(url);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return CacheLookup::Miss(MissReason::Absent),
            Err(e) => {
                tracing::warn!(%key, error = %e, "thumbnail cache read failed");
                return CacheLookup::Miss(MissReason::Unavailable);
            }
        };

        let reason = match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if entry.is_expired_at(now_ms) => MissReason::Expired,
            Ok(entry) => match entry.payload() {
                Some(payload) => {
                    tracing::debug!(%key, url, "thumbnail cache hit");
                    return CacheLookup::Hit(payload);
                }
                None => MissReason::Corrupt,
            },
            Err(e) => {
                tracing::warn!(%key, error = %e, "discarding unreadable thumbnail cache entry");
                MissReason::Corrupt
            }
        };

        self.evict(&key).await;
        CacheLookup::Miss(reason)
    }

    /// Look up `url`, flattening every kind of miss to `None`.
    pub async fn get(&self, url: &str) -> Option<Payload> {
        self.lookup(url).await.into_payload()
    }

    /// Store `payload` for `url`. Returns whether anything was written.
    pub async fn put(&self, url: &str, payload: &Payload) -> bool {
        if Self::is_always_fresh(url) {
            tracing::debug!(url, "not caching always-fresh host");
            return false;
        }

        let key = compute_cache_key(url);
        let entry = CacheEntry::new(url, payload, chrono::Utc::now().timestamp_millis());
        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(%key, error = %e, "failed to serialize thumbnail cache entry");
                return false;
            }
        };

        match self.store.set(&key, &json).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%key, error = %e, "thumbnail cache write failed");
                false
            }
        }
    }

    /// Evict every namespaced entry that is expired or unreadable.
    ///
    /// Returns the number of evicted keys.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(chrono::Utc::now().timestamp_millis()).await
    }

    async fn sweep_at(&self, now_ms: i64) -> usize {
        let keys = match self.store.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "thumbnail cache sweep could not list keys");
                return 0;
            }
        };

        let mut evicted = 0;
        for key in keys.iter().filter(|k| is_cache_key(k)) {
            let stale = match self.store.get(key).await {
                Ok(Some(raw)) => serde_json::from_str::<CacheEntry>(&raw)
                    .map(|entry| entry.is_expired_at(now_ms))
                    .unwrap_or(true),
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!(%key, error = %e, "thumbnail cache sweep read failed");
                    false
                }
            };
            if stale && self.evict(key).await {
                evicted += 1;
            }
        }
        evicted
    }

    async fn evict(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%key, error = %e, "thumbnail cache eviction failed");
                false
            }
        }
    }
}
