use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    application::repos::BackendError, domain::error::DomainError, infra::error::InfraError,
};

/// Diagnostic details carried on a response for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// `{"error": {"code", "message", "hint"?}}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorBody {
    pub fn new(code: &str, message: &str, hint: Option<String>) -> Self {
        Self {
            error: ErrorMessage {
                code: code.to_string(),
                message: message.to_string(),
                hint,
            },
        }
    }
}

pub mod codes {
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const NOT_FOUND: &str = "not_found";
    pub const BACKEND_AUTH: &str = "backend_auth";
    pub const UNAVAILABLE: &str = "unavailable";
    pub const INTERNAL: &str = "internal";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("document `{target}` not found")]
    NotFound { target: String },
    #[error("backend rejected the service credentials")]
    BackendAuth(#[source] BackendError),
    #[error("backend unavailable")]
    Unavailable(#[source] BackendError),
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_found(target: impl ToString) -> Self {
        Self::NotFound {
            target: target.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify a backend failure for the document at `target`.
    pub fn from_backend(target: impl ToString, error: BackendError) -> Self {
        match error {
            BackendError::NotFound => Self::not_found(target),
            BackendError::Auth { .. } => Self::BackendAuth(error),
            BackendError::Unavailable { .. } => Self::Unavailable(error),
            BackendError::Protocol { message } => Self::Internal { message },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BackendAuth(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput { .. } => codes::INVALID_INPUT,
            AppError::NotFound { .. } => codes::NOT_FOUND,
            AppError::BackendAuth(_) => codes::BACKEND_AUTH,
            AppError::Unavailable(_) => codes::UNAVAILABLE,
            AppError::Internal { .. } => codes::INTERNAL,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::InvalidInput { .. } => "Request could not be processed",
            AppError::NotFound { .. } => "Document not found",
            AppError::BackendAuth(_) => "Document backend refused access",
            AppError::Unavailable(_) => "Document backend temporarily unavailable",
            AppError::Internal { .. } => "Unexpected error occurred",
        }
    }

    // Only client-correctable details are echoed back.
    fn hint(&self) -> Option<String> {
        match self {
            AppError::InvalidInput { message } => Some(message.clone()),
            AppError::NotFound { target } => Some(format!("No document at `{target}`")),
            _ => None,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        Self::invalid_input(error.to_string())
    }
}

impl From<InfraError> for AppError {
    fn from(error: InfraError) -> Self {
        Self::internal(error.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody::new(self.code(), self.presentation_message(), self.hint());
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
