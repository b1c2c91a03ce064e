//! Cache store seam and the in-process implementation.
//!
//! A store only moves opaque strings with an expiry. It reports transport
//! problems as `CacheStoreError`; deciding what a failure means for a request
//! is the adapter's job.

use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use thiserror::Error;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store::memory";
const MAX_MEMORY_TTL: Duration = Duration::from_secs(365 * 24 * 3600);

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache server `{server}` unreachable: {source}")]
    Connect {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cache `{op}` timed out after {timeout_ms} ms")]
    Timeout { op: &'static str, timeout_ms: u128 },
    #[error("cache i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected cache reply: {0}")]
    Protocol(String),
    #[error("connection closed by cache server")]
    Closed,
    #[error("cache server rejected `{op}`: {message}")]
    Server { op: &'static str, message: String },
    #[error("invalid cache key `{key}`: {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("no cache servers configured")]
    NoServers,
}

impl CacheStoreError {
    pub fn timeout(op: &'static str, after: Duration) -> Self {
        Self::Timeout {
            op,
            timeout_ms: after.as_millis(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// The peer had already dropped the connection; the server itself may be fine.
    pub(crate) fn is_stale_connection(&self) -> bool {
        match self {
            Self::Closed => true,
            Self::Io(err) => matches!(
                err.kind(),
                ErrorKind::BrokenPipe
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

/// Key-value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheStoreError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheStoreError>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process store with LRU eviction and per-entry expiry.
pub struct MemoryStore {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.memory_capacity_non_zero())
    }

    /// Number of entries held, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        Ok(self.lookup(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheStoreError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + MAX_MEMORY_TTL);
        let entry = Entry {
            value: value.to_string(),
            expires_at,
        };
        rw_write(&self.entries, SOURCE, "set").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheStoreError> {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
        Ok(())
    }
}
