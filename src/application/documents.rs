//! Cache-aside document service.
//!
//! Reads try the cache and fall through to the backend without writing the
//! result back. Only `promote` and `upsert` populate the cache, and both go to
//! the backend first. `invalidate` never touches the backend.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::application::error::AppError;
use crate::application::repos::DocumentRepo;
use crate::cache::{CacheAdapter, CacheKey, CacheLookup};
use crate::domain::{Document, DocumentRef, Provenance};

/// A document together with where it was served from.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDocument {
    pub document: Document,
    pub provenance: Provenance,
    /// Set whenever the cache holds (or was asked to hold) this document.
    pub cache_key: Option<CacheKey>,
}

#[derive(Clone)]
pub struct DocumentService {
    repo: Arc<dyn DocumentRepo>,
    cache: CacheAdapter,
}

impl DocumentService {
    pub fn new(repo: Arc<dyn DocumentRepo>, cache: CacheAdapter) -> Self {
        Self { repo, cache }
    }

    #[instrument(skip(self), fields(target = %target))]
    pub async fn read(&self, target: &DocumentRef) -> Result<CachedDocument, AppError> {
        let key = self.cache.derive_key(target);

        if let CacheLookup::Hit(raw) = self.cache.get(&key).await {
            match Document::from_json_str(&raw) {
                Ok(document) => {
                    return Ok(CachedDocument {
                        document,
                        provenance: Provenance::Cache,
                        cache_key: Some(key),
                    });
                }
                Err(err) => {
                    warn!(
                        target = "cccache::documents",
                        key = %key,
                        error = %err,
                        "discarding undecodable cache entry"
                    );
                }
            }
        }

        let document = self
            .repo
            .read(target)
            .await
            .map_err(|err| AppError::from_backend(target, err))?;
        debug!(key = %key, "served from backend");

        Ok(CachedDocument {
            document,
            provenance: Provenance::Backend,
            cache_key: None,
        })
    }

    /// Copy the backend's current version into the cache.
    #[instrument(skip(self), fields(target = %target))]
    pub async fn promote(
        &self,
        target: &DocumentRef,
        ttl: Option<Duration>,
    ) -> Result<CachedDocument, AppError> {
        let document = self
            .repo
            .read(target)
            .await
            .map_err(|err| AppError::from_backend(target, err))?;
        let serialized = serialize(&document)?;

        let key = self.cache.derive_key(target);
        self.cache.set(&key, &serialized, ttl).await;

        Ok(CachedDocument {
            document,
            provenance: Provenance::Promoted,
            cache_key: Some(key),
        })
    }

    /// Write `document` to the backend, then cache it.
    #[instrument(skip(self, document), fields(target = %target))]
    pub async fn upsert(
        &self,
        target: &DocumentRef,
        document: Document,
        ttl: Option<Duration>,
    ) -> Result<CachedDocument, AppError> {
        let document = document.strip_metadata();
        let serialized = serialize(&document)?;

        self.repo
            .write(target, &document)
            .await
            .map_err(|err| AppError::from_backend(target, err))?;

        let key = self.cache.derive_key(target);
        self.cache.set(&key, &serialized, ttl).await;

        Ok(CachedDocument {
            document,
            provenance: Provenance::BackendWrite,
            cache_key: Some(key),
        })
    }

    /// Drop the cached copy, if any. Returns the key that was cleared.
    #[instrument(skip(self), fields(target = %target))]
    pub async fn invalidate(&self, target: &DocumentRef) -> CacheKey {
        let key = self.cache.derive_key(target);
        self.cache.delete(&key).await;
        key
    }
}

fn serialize(document: &Document) -> Result<String, AppError> {
    document
        .to_json_string()
        .map_err(|err| AppError::internal(format!("failed to serialize document: {err}")))
}
