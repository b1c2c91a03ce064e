//! Document cache.
//!
//! - [`CacheAdapter`]: key scheme, expiry policy, failure absorption
//! - [`CacheStore`]: the key-value seam, implemented by [`MemcachedStore`]
//!   and the in-process [`MemoryStore`]
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "memcached"          # or "memory", "disabled"
//! servers = ["localhost:11211"]
//! prefix = "ccc"
//! ttl_seconds = 3600
//! ```

mod adapter;
mod config;
mod keys;
mod lock;
mod memcached;
mod store;

pub use adapter::{CacheAdapter, CacheLookup};
pub use config::{CacheBackendKind, CacheConfig};
pub use keys::{CacheKey, MAX_KEY_LEN, derive_key, derive_key_for};
pub use memcached::MemcachedStore;
pub use store::{CacheStore, CacheStoreError, MemoryStore};

pub(crate) use adapter::{METRIC_CACHE_ERROR_TOTAL, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_MISS_TOTAL};
pub(crate) use config::{
    DEFAULT_MAX_IDLE_CONNECTIONS, DEFAULT_MEMORY_CAPACITY, DEFAULT_PREFIX, DEFAULT_SERVER,
    DEFAULT_TIMEOUT_MS, DEFAULT_TTL_SECS,
};
