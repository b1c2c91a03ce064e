//! Cache key derivation.
//!
//! Keys look like `ccc.notes_abc123`: namespace prefix, a dot, the collection
//! segment, an underscore, then the document id. The format is persisted in
//! the cache store and must stay stable across releases.

use std::borrow::Cow;
use std::fmt;

use crate::domain::{CollectionName, DocumentId, DocumentRef};

/// Longest key memcached accepts.
pub const MAX_KEY_LEN: usize = 250;

const SEGMENT_SEPARATOR: char = '_';
const ESCAPED_SEPARATOR: &str = "%5F";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the key for `(collection, id)` under `prefix`.
pub fn derive_key(prefix: &str, collection: &CollectionName, id: &DocumentId) -> CacheKey {
    let segment = collection_segment(collection.as_str());
    let mut key = String::with_capacity(prefix.len() + segment.len() + id.as_str().len() + 2);
    key.push_str(prefix);
    key.push('.');
    key.push_str(&segment);
    key.push(SEGMENT_SEPARATOR);
    key.push_str(id.as_str());
    CacheKey(key)
}

/// Convenience wrapper over [`derive_key`] for a validated pair.
pub fn derive_key_for(prefix: &str, target: &DocumentRef) -> CacheKey {
    derive_key(prefix, &target.collection, &target.id)
}

// Collections may contain the separator themselves; escaping it keeps the first
// `_` after the dot unambiguous so distinct pairs never share a key.
fn collection_segment(collection: &str) -> Cow<'_, str> {
    if collection.contains(SEGMENT_SEPARATOR) {
        Cow::Owned(collection.replace(SEGMENT_SEPARATOR, ESCAPED_SEPARATOR))
    } else {
        Cow::Borrowed(collection)
    }
}
