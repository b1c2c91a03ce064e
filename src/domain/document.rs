//! JSON documents as mirrored between the backend and the cache.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::DomainError;

/// Fields owned by the storage backend (identity and revision markers).
pub const METADATA_FIELDS: [&str; 2] = ["_id", "_rev"];

/// A JSON object. No schema is enforced beyond "decodes as an object".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DomainError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|err| DomainError::invalid_document(format!("malformed JSON: {err}")))?;
        Self::from_value(value)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, DomainError> {
        Self::from_slice(raw.as_bytes())
    }

    pub fn from_value(value: Value) -> Result<Self, DomainError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(DomainError::invalid_document(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Remove backend metadata so a client write cannot forge identity or revision.
    pub fn strip_metadata(mut self) -> Self {
        for field in METADATA_FIELDS {
            self.0.remove(field);
        }
        self
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Where a returned document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Decoded from a cache hit.
    Cache,
    /// Read from the backend after a cache miss; not written back.
    Backend,
    /// Read from the backend and copied into the cache.
    Promoted,
    /// Written to the backend and then copied into the cache.
    BackendWrite,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Cache => "cache",
            Provenance::Backend => "backend",
            Provenance::Promoted => "promoted",
            Provenance::BackendWrite => "backend-write",
        }
    }
}
