//! Advisory TTL cache in front of the external signal clients.
//!
//! The cache never fails a verification: a store error is logged and
//! treated as a miss, and a disabled cache is a pass-through.

mod store;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

pub use store::{CacheStore, MemoryCacheStore, NoopCacheStore};

/// Hex characters of the digest kept in a key.
const KEY_DIGEST_LEN: usize = 16;

#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    enabled: Arc<AtomicBool>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// In-process cache holding at most `max_entries` records.
    pub fn memory(max_entries: u64) -> Self {
        Self::new(Arc::new(MemoryCacheStore::new(max_entries)))
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        let cache = Self::new(Arc::new(NoopCacheStore));
        cache.disable();
        cache
    }

    /// Stop reading and writing. Every later `get` is a miss.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn backend(&self) -> &'static str {
        if self.is_enabled() {
            self.store.backend()
        } else {
            "disabled"
        }
    }

    /// Deterministic key: `prefix:` plus a SHA-256 digest of the ordered
    /// arguments joined with `:`.
    pub fn make_key(prefix: &str, args: &[&str]) -> String {
        let digest = Sha256::digest(args.join(":").as_bytes());
        let hex = hex::encode(digest);
        format!("{}:{}", prefix, &hex[..KEY_DIGEST_LEN])
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.is_enabled() {
            return None;
        }
        match self.store.get(key).await {
            Ok(Some(body)) => match serde_json::from_str(&body) {
                Ok(value) => {
                    debug!(key = %key, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if !self.is_enabled() {
            return;
        }
        let body = match serde_json::to_string(value) {
            Ok(body) => body,
            Err(e) => {
                warn!(key = %key, error = %e, "cache value not serializable");
                return;
            }
        };
        if let Err(e) = self.store.set(key, body, ttl).await {
            warn!(key = %key, error = %e, "cache write failed");
        }
    }

    pub async fn delete(&self, key: &str) {
        if !self.is_enabled() {
            return;
        }
        if let Err(e) = self.store.delete(key).await {
            warn!(key = %key, error = %e, "cache delete failed");
        }
    }

    /// Return the cached value for `key`, or run `fetch` and cache its
    /// success. Errors are returned as-is and never cached.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let value = fetch().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend())
            .finish()
    }
}
