//! Repository trait describing the document backend.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Document, DocumentRef};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("document not found")]
    NotFound,
    #[error("backend refused access (HTTP {status})")]
    Auth { status: u16 },
    #[error("backend unavailable: {message}")]
    Unavailable { message: String },
    #[error("unexpected backend response: {message}")]
    Protocol { message: String },
}

impl BackendError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Label used for the `kind` dimension of backend error metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::NotFound => "not_found",
            BackendError::Auth { .. } => "auth",
            BackendError::Unavailable { .. } => "unavailable",
            BackendError::Protocol { .. } => "protocol",
        }
    }
}

/// Key-based access to documents in their named collections.
#[async_trait]
pub trait DocumentRepo: Send + Sync {
    async fn read(&self, target: &DocumentRef) -> Result<Document, BackendError>;

    /// Create the document, or replace it if it already exists.
    async fn write(&self, target: &DocumentRef, document: &Document) -> Result<(), BackendError>;
}
