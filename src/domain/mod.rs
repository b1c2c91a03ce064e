//! Domain types: validated identifiers and JSON documents.

pub mod document;
pub mod error;
pub mod identifiers;

pub use document::{Document, Provenance};
pub use error::DomainError;
pub use identifiers::{CollectionName, DocumentId, DocumentRef};
