use axum::extract::rejection::BytesRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::application::error::AppError;
use crate::domain::Document;

use super::HttpState;
use super::envelope::Envelope;
use super::error::ApiError;
use super::extract::{DocumentPath, TtlQuery};

pub(super) async fn read_document(
    State(state): State<HttpState>,
    DocumentPath(target): DocumentPath,
) -> Result<Envelope, AppError> {
    let result = state.documents.read(&target).await?;
    Ok(Envelope::document(result, state.expose_dev_metadata))
}

pub(super) async fn promote_document(
    State(state): State<HttpState>,
    DocumentPath(target): DocumentPath,
    Query(query): Query<TtlQuery>,
) -> Result<Envelope, AppError> {
    let ttl = query.ttl()?;
    let result = state.documents.promote(&target, ttl).await?;
    Ok(Envelope::document(result, state.expose_dev_metadata))
}

pub(super) async fn upsert_document(
    State(state): State<HttpState>,
    DocumentPath(target): DocumentPath,
    Query(query): Query<TtlQuery>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return ApiError::payload_too_large(rejection.body_text()).into_response();
        }
        Err(rejection) => return ApiError::bad_request(rejection.body_text()).into_response(),
    };

    let outcome = async {
        let ttl = query.ttl()?;
        let document = Document::from_slice(&body)?;
        let result = state.documents.upsert(&target, document, ttl).await?;
        Ok::<_, AppError>(Envelope::document(result, state.expose_dev_metadata))
    };

    match outcome.await {
        Ok(envelope) => envelope.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn invalidate_document(
    State(state): State<HttpState>,
    DocumentPath(target): DocumentPath,
) -> Envelope {
    let key = state.documents.invalidate(&target).await;
    Envelope::invalidated(key, state.expose_dev_metadata)
}

/// Succeeds whenever the Basic guard let the request through.
pub(super) async fn auth_probe() -> Envelope {
    Envelope::empty()
}

pub(super) async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
