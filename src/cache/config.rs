//! Cache configuration.
//!
//! Built from the `[cache]` section of `cccache.toml` after validation.

use std::num::NonZeroUsize;
use std::time::Duration;

// Default values for cache configuration
pub(crate) const DEFAULT_PREFIX: &str = "ccc";
pub(crate) const DEFAULT_SERVER: &str = "localhost:11211";
pub(crate) const DEFAULT_TTL_SECS: u64 = 3600;
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 500;
pub(crate) const DEFAULT_MEMORY_CAPACITY: usize = 10_000;
pub(crate) const DEFAULT_MAX_IDLE_CONNECTIONS: usize = 8;

/// Which store sits behind the cache adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// memcached servers over the ASCII protocol.
    Memcached,
    /// In-process LRU, useful for single-node deployments and tests.
    Memory,
    /// No store; every read misses and every write is dropped.
    Disabled,
}

impl CacheBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackendKind::Memcached => "memcached",
            CacheBackendKind::Memory => "memory",
            CacheBackendKind::Disabled => "disabled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memcached" => Some(CacheBackendKind::Memcached),
            "memory" => Some(CacheBackendKind::Memory),
            "disabled" | "none" | "off" => Some(CacheBackendKind::Disabled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    /// `host:port` entries; keys are spread across them.
    pub servers: Vec<String>,
    /// Namespace tag placed in front of every derived key.
    pub prefix: String,
    /// Expiry applied when a caller does not pass its own.
    pub default_ttl: Duration,
    /// Upper bound for every network step against a cache server.
    pub timeout: Duration,
    /// Maximum entries held by the in-process store.
    pub memory_capacity: usize,
    /// Idle connections kept per memcached server.
    pub max_idle_connections: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memcached,
            servers: vec![DEFAULT_SERVER.to_string()],
            prefix: DEFAULT_PREFIX.to_string(),
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            max_idle_connections: DEFAULT_MAX_IDLE_CONNECTIONS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            servers: settings.servers.clone(),
            prefix: settings.prefix.clone(),
            default_ttl: settings.ttl,
            timeout: settings.timeout,
            memory_capacity: settings.memory_capacity.get(),
            max_idle_connections: settings.max_idle_connections.get(),
        }
    }
}

impl CacheConfig {
    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
