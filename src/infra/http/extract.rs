//! Request guards: identifier validation and the `ttl` query parameter.

use std::time::Duration;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use serde::Deserialize;

use crate::application::error::AppError;
use crate::domain::DocumentRef;

/// `/{collection}/{id}` after both identifiers passed validation.
///
/// Handlers taking this extractor never run for malformed identifiers, so the
/// service and its adapters only ever see well-formed pairs.
#[derive(Debug, Clone)]
pub struct DocumentPath(pub DocumentRef);

impl<S> FromRequestParts<S> for DocumentPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((collection, id)) = Path::<(String, String)>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::invalid_input(rejection.body_text()))?;
        let target = DocumentRef::parse(&collection, &id)?;
        Ok(Self(target))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TtlQuery {
    ttl: Option<String>,
}

impl TtlQuery {
    /// Requested lifetime for the cache entry. Absent means the configured default.
    pub fn ttl(&self) -> Result<Option<Duration>, AppError> {
        let Some(raw) = self.ttl.as_deref() else {
            return Ok(None);
        };
        match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(AppError::invalid_input(format!(
                "ttl must be a positive number of seconds, got `{raw}`"
            ))),
            Ok(seconds) => Ok(Some(Duration::from_secs(seconds))),
        }
    }
}
