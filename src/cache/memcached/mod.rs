//! memcached-backed cache store.
//!
//! Keys are spread over the configured servers by a stable hash, so a key
//! maps to the same server after a restart as long as the server list is
//! unchanged. Each server keeps a small pool of idle connections.

mod protocol;

use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::BufStream;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::config::CacheConfig;
use super::lock::mutex_lock;
use super::store::{CacheStore, CacheStoreError};

const SOURCE: &str = "cache::memcached";

type Connection = BufStream<TcpStream>;

struct ServerPool {
    address: String,
    idle: Mutex<Vec<Connection>>,
    max_idle: usize,
}

impl ServerPool {
    fn new(address: String, max_idle: usize) -> Self {
        Self {
            address,
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// An idle connection when one is pooled (`true`), otherwise a fresh one.
    async fn checkout(&self, limit: Duration) -> Result<(Connection, bool), CacheStoreError> {
        if let Some(conn) = mutex_lock(&self.idle, SOURCE, "checkout").pop() {
            return Ok((conn, true));
        }
        Ok((self.connect(limit).await?, false))
    }

    async fn connect(&self, limit: Duration) -> Result<Connection, CacheStoreError> {
        let stream = match timeout(limit, TcpStream::connect(self.address.as_str())).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(CacheStoreError::Connect {
                    server: self.address.clone(),
                    source,
                });
            }
            Err(_) => return Err(CacheStoreError::timeout("connect", limit)),
        };
        stream.set_nodelay(true)?;
        debug!(server = %self.address, "opened memcached connection");
        Ok(BufStream::new(stream))
    }

    fn checkin(&self, conn: Connection) {
        let mut idle = mutex_lock(&self.idle, SOURCE, "checkin");
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }

    fn discard_idle(&self) {
        mutex_lock(&self.idle, SOURCE, "discard_idle").clear();
    }

    /// Return the connection when the exchange left it in a known state.
    fn settle<T>(
        &self,
        conn: Connection,
        outcome: Result<Result<T, CacheStoreError>, tokio::time::error::Elapsed>,
        op: &'static str,
        limit: Duration,
    ) -> Result<T, CacheStoreError> {
        match outcome {
            Ok(Ok(value)) => {
                self.checkin(conn);
                Ok(value)
            }
            Ok(Err(err @ CacheStoreError::Server { .. })) => {
                self.checkin(conn);
                Err(err)
            }
            Ok(Err(err)) => {
                // Broken stream; idle siblings likely share its fate.
                self.discard_idle();
                Err(err)
            }
            Err(_) => Err(CacheStoreError::timeout(op, limit)),
        }
    }
}

/// One memcached command for a single key.
enum Request<'a> {
    Get,
    Set { value: &'a [u8], exptime: u64 },
    Delete,
}

impl Request<'_> {
    fn op(&self) -> &'static str {
        match self {
            Request::Get => "get",
            Request::Set { .. } => "set",
            Request::Delete => "delete",
        }
    }

    async fn send(
        &self,
        conn: &mut Connection,
        key: &str,
    ) -> Result<Option<Vec<u8>>, CacheStoreError> {
        match self {
            Request::Get => protocol::get(conn, key).await,
            Request::Set { value, exptime } => {
                protocol::set(conn, key, value, *exptime).await?;
                Ok(None)
            }
            Request::Delete => {
                protocol::delete(conn, key).await?;
                Ok(None)
            }
        }
    }
}

/// Cache store speaking the memcached ASCII protocol.
pub struct MemcachedStore {
    servers: Vec<ServerPool>,
    timeout: Duration,
}

impl MemcachedStore {
    pub fn new(servers: &[String], timeout: Duration, max_idle: usize) -> Self {
        Self {
            servers: servers
                .iter()
                .map(|address| ServerPool::new(address.clone(), max_idle))
                .collect(),
            timeout,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.servers, config.timeout, config.max_idle_connections)
    }

    /// Addresses in the order used for key distribution.
    pub fn servers(&self) -> impl Iterator<Item = &str> {
        self.servers.iter().map(|pool| pool.address.as_str())
    }

    fn pool_for(&self, key: &str) -> Result<&ServerPool, CacheStoreError> {
        match self.servers.len() {
            0 => Err(CacheStoreError::NoServers),
            1 => Ok(&self.servers[0]),
            count => Ok(&self.servers[server_index(key, count)]),
        }
    }

    /// Run `request` against the server owning `key`.
    ///
    /// A pooled connection the server has since closed is replaced by a fresh
    /// one and the request is sent again. All three commands are idempotent.
    async fn execute(
        &self,
        key: &str,
        request: Request<'_>,
    ) -> Result<Option<Vec<u8>>, CacheStoreError> {
        protocol::validate_key(key)?;
        let pool = self.pool_for(key)?;
        let op = request.op();

        let (mut conn, reused) = pool.checkout(self.timeout).await?;
        let outcome = timeout(self.timeout, request.send(&mut conn, key)).await;
        match outcome {
            Ok(Err(err)) if reused && err.is_stale_connection() => {
                debug!(
                    server = %pool.address,
                    op,
                    error = %err,
                    "pooled memcached connection was closed, reconnecting"
                );
                drop(conn);
                pool.discard_idle();
                let mut conn = pool.connect(self.timeout).await?;
                let outcome = timeout(self.timeout, request.send(&mut conn, key)).await;
                pool.settle(conn, outcome, op, self.timeout)
            }
            outcome => pool.settle(conn, outcome, op, self.timeout),
        }
    }
}

/// Stable server choice for `key` among `count` servers.
pub(crate) fn server_index(key: &str, count: usize) -> usize {
    let digest = Sha256::digest(key.as_bytes()).to_vec();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % count as u64) as usize
}

#[async_trait]
impl CacheStore for MemcachedStore {
    fn name(&self) -> &'static str {
        "memcached"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        self.execute(key, Request::Get)
            .await?
            .map(|bytes| {
                String::from_utf8(bytes)
                    .map_err(|_| CacheStoreError::protocol("cached value is not UTF-8"))
            })
            .transpose()
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheStoreError> {
        let request = Request::Set {
            value: value.as_bytes(),
            exptime: protocol::expiry_field(ttl, SystemTime::now()),
        };
        self.execute(key, request).await.map(|_| ())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheStoreError> {
        self.execute(key, Request::Delete).await.map(|_| ())
    }
}
