use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid {field} `{value}`: does not match {pattern}")]
    InvalidIdentifier {
        field: &'static str,
        value: String,
        pattern: &'static str,
    },
    #[error("invalid document: {message}")]
    InvalidDocument { message: String },
}

impl DomainError {
    pub fn invalid_identifier(
        field: &'static str,
        value: impl Into<String>,
        pattern: &'static str,
    ) -> Self {
        Self::InvalidIdentifier {
            field,
            value: value.into(),
            pattern,
        }
    }

    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }
}
