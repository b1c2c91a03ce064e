//! Identifier grammars for collections and documents.
//!
//! A `DocumentRef` can only be built from identifiers that passed both
//! grammars, so everything downstream of the HTTP guard (cache keys, backend
//! URLs) may assume the values are well formed.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::DomainError;

/// Lowercase letter followed by at least one lowercase alphanumeric, `-` or `_`.
pub const PATTERN_COLLECTION_NAME: &str = r"^[a-z][a-z0-9\-_]+$";

/// Alphanumerics, `-` and `_`, case-insensitive.
pub const PATTERN_DOCUMENT_ID: &str = r"^[a-zA-Z0-9\-_]+$";

static COLLECTION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(PATTERN_COLLECTION_NAME).expect("collection pattern compiles"));
static DOCUMENT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(PATTERN_DOCUMENT_ID).expect("document id pattern compiles"));

/// Returns true when `value` is an acceptable collection name.
pub fn is_valid_collection_name(value: &str) -> bool {
    COLLECTION_NAME.is_match(value)
}

/// Returns true when `value` is an acceptable document identifier.
pub fn is_valid_document_id(value: &str) -> bool {
    DOCUMENT_ID.is_match(value)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionName(String);

impl CollectionName {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if is_valid_collection_name(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::invalid_identifier(
                "collection",
                value,
                PATTERN_COLLECTION_NAME,
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if is_valid_document_id(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::invalid_identifier(
                "document_id",
                value,
                PATTERN_DOCUMENT_ID,
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated `(collection, id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub collection: CollectionName,
    pub id: DocumentId,
}

impl DocumentRef {
    pub fn new(collection: CollectionName, id: DocumentId) -> Self {
        Self { collection, id }
    }

    /// Validate the collection first, then the id.
    pub fn parse(collection: &str, id: &str) -> Result<Self, DomainError> {
        let collection = CollectionName::parse(collection)?;
        let id = DocumentId::parse(id)?;
        Ok(Self { collection, id })
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
