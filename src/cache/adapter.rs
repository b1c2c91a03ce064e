//! Cache adapter used by the document service.
//!
//! Owns the key scheme and the expiry policy, and turns every store failure
//! into a miss (reads) or a dropped write. A broken cache slows requests down
//! but never fails them.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use crate::domain::DocumentRef;

use super::config::{CacheBackendKind, CacheConfig};
use super::keys::{CacheKey, derive_key_for};
use super::memcached::MemcachedStore;
use super::store::{CacheStore, CacheStoreError, MemoryStore};

pub(crate) const METRIC_CACHE_HIT_TOTAL: &str = "cccache_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS_TOTAL: &str = "cccache_cache_miss_total";
pub(crate) const METRIC_CACHE_ERROR_TOTAL: &str = "cccache_cache_error_total";

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(String),
    Miss,
}

#[derive(Clone)]
pub struct CacheAdapter {
    store: Option<Arc<dyn CacheStore>>,
    prefix: String,
    default_ttl: Duration,
}

impl CacheAdapter {
    pub fn new(
        store: Option<Arc<dyn CacheStore>>,
        prefix: impl Into<String>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            default_ttl,
        }
    }

    /// Build the adapter together with the store selected by `config.backend`.
    pub fn from_config(config: &CacheConfig) -> Self {
        let store: Option<Arc<dyn CacheStore>> = match config.backend {
            CacheBackendKind::Memcached => Some(Arc::new(MemcachedStore::from_config(config))),
            CacheBackendKind::Memory => Some(Arc::new(MemoryStore::from_config(config))),
            CacheBackendKind::Disabled => None,
        };
        Self::new(store, config.prefix.clone(), config.default_ttl)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Name of the attached store, `"disabled"` when there is none.
    pub fn store_name(&self) -> &'static str {
        self.store
            .as_ref()
            .map(|store| store.name())
            .unwrap_or(CacheBackendKind::Disabled.as_str())
    }

    pub fn derive_key(&self, target: &DocumentRef) -> CacheKey {
        derive_key_for(&self.prefix, target)
    }

    pub async fn get(&self, key: &CacheKey) -> CacheLookup {
        let Some(store) = &self.store else {
            counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
            return CacheLookup::Miss;
        };

        match store.get(key.as_str()).await {
            Ok(Some(value)) => {
                counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
                debug!(key = %key, store = store.name(), "cache hit");
                CacheLookup::Hit(value)
            }
            Ok(None) => {
                counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
                debug!(key = %key, store = store.name(), "cache miss");
                CacheLookup::Miss
            }
            Err(err) => {
                record_failure("get", store.name(), key, &err);
                counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
                CacheLookup::Miss
            }
        }
    }

    /// Store `value` under `key`. `None` applies the default TTL.
    pub async fn set(&self, key: &CacheKey, value: &str, ttl: Option<Duration>) {
        let Some(store) = &self.store else {
            return;
        };
        let ttl = ttl.unwrap_or(self.default_ttl);
        if let Err(err) = store.set(key.as_str(), value, ttl).await {
            record_failure("set", store.name(), key, &err);
        }
    }

    pub async fn delete(&self, key: &CacheKey) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.delete(key.as_str()).await {
            record_failure("delete", store.name(), key, &err);
        }
    }
}

fn record_failure(op: &'static str, store: &'static str, key: &CacheKey, err: &CacheStoreError) {
    counter!(METRIC_CACHE_ERROR_TOTAL, "op" => op).increment(1);
    warn!(
        target = "cccache::cache",
        op,
        store,
        key = %key,
        error = %err,
        "cache operation failed; continuing without cache"
    );
}
