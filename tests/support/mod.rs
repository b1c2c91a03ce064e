//! In-memory fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cccache::application::documents::DocumentService;
use cccache::application::repos::{BackendError, DocumentRepo};
use cccache::cache::{CacheAdapter, CacheStore, CacheStoreError, MemoryStore};
use cccache::domain::{Document, DocumentRef};

/// How the fake backend should answer the next calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Healthy,
    Unreachable,
    Forbidden,
}

pub struct FakeBackend {
    documents: Mutex<HashMap<String, Document>>,
    mode: Mutex<BackendMode>,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            mode: Mutex::new(BackendMode::Healthy),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }
}

impl FakeBackend {
    pub async fn insert(&self, target: &DocumentRef, document: Document) {
        self.documents
            .lock()
            .await
            .insert(target.to_string(), document);
    }

    pub async fn stored(&self, target: &DocumentRef) -> Option<Document> {
        self.documents.lock().await.get(&target.to_string()).cloned()
    }

    pub async fn set_mode(&self, mode: BackendMode) {
        *self.mode.lock().await = mode;
    }

    pub fn calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }

    async fn check_mode(&self) -> Result<(), BackendError> {
        match *self.mode.lock().await {
            BackendMode::Healthy => Ok(()),
            BackendMode::Unreachable => Err(BackendError::unavailable("connection refused")),
            BackendMode::Forbidden => Err(BackendError::Auth { status: 403 }),
        }
    }
}

#[async_trait]
impl DocumentRepo for FakeBackend {
    async fn read(&self, target: &DocumentRef) -> Result<Document, BackendError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_mode().await?;
        self.documents
            .lock()
            .await
            .get(&target.to_string())
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn write(&self, target: &DocumentRef, document: &Document) -> Result<(), BackendError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_mode().await?;
        self.documents
            .lock()
            .await
            .insert(target.to_string(), document.clone());
        Ok(())
    }
}

/// In-process store that counts calls and can be switched into a failing state.
pub struct FlakyStore {
    inner: MemoryStore,
    down: AtomicBool,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub deletes: AtomicUsize,
    ttls: std::sync::Mutex<Vec<Duration>>,
}

impl Default for FlakyStore {
    fn default() -> Self {
        Self {
            inner: MemoryStore::new(NonZeroUsize::new(128).expect("non-zero")),
            down: AtomicBool::new(false),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            ttls: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl FlakyStore {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
            + self.sets.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    /// Expiries requested by `set`, in call order.
    pub fn ttls(&self) -> Vec<Duration> {
        self.ttls.lock().expect("ttl log lock").clone()
    }

    /// Read the raw entry without touching the counters.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.expect("memory store never fails")
    }

    /// Write a raw entry without touching the counters.
    pub async fn poke(&self, key: &str, value: &str) {
        self.inner
            .set(key, value, Duration::from_secs(60))
            .await
            .expect("memory store never fails");
    }

    fn check(&self, op: &'static str) -> Result<(), CacheStoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(CacheStoreError::timeout(op, Duration::from_millis(500)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check("get")?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheStoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.ttls.lock().expect("ttl log lock").push(ttl);
        self.check("set")?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheStoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check("delete")?;
        self.inner.delete(key).await
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub store: Arc<FlakyStore>,
    pub service: DocumentService,
}

pub fn harness() -> Harness {
    let backend = Arc::new(FakeBackend::default());
    let store = Arc::new(FlakyStore::default());
    let shared_store: Arc<dyn CacheStore> = store.clone();
    let cache = CacheAdapter::new(Some(shared_store), "ccc", Duration::from_secs(3600));
    let service = DocumentService::new(backend.clone(), cache);
    Harness {
        backend,
        store,
        service,
    }
}

pub fn doc(value: serde_json::Value) -> Document {
    Document::from_value(value).expect("test documents are objects")
}

pub fn target(collection: &str, id: &str) -> DocumentRef {
    DocumentRef::parse(collection, id).expect("valid identifiers")
}
