use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::application::documents::CachedDocument;
use crate::cache::CacheKey;

pub const DEV_FIELD: &str = "_dev";

/// Diagnostic block describing how a response was produced.
#[derive(Debug, Default, Serialize)]
pub struct DevMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
}

/// Document fields at the top level plus an optional `_dev` block.
#[derive(Debug)]
pub struct Envelope {
    fields: Map<String, Value>,
    dev: Option<DevMetadata>,
}

impl Envelope {
    pub fn document(result: CachedDocument, expose_dev: bool) -> Self {
        let dev = expose_dev.then(|| DevMetadata {
            source: Some(result.provenance.as_str()),
            cache_key: result.cache_key.map(CacheKey::into_string),
        });
        Self {
            fields: result.document.into_fields(),
            dev,
        }
    }

    pub fn invalidated(key: CacheKey, expose_dev: bool) -> Self {
        let dev = expose_dev.then(|| DevMetadata {
            source: None,
            cache_key: Some(key.into_string()),
        });
        Self {
            fields: Map::new(),
            dev,
        }
    }

    pub fn empty() -> Self {
        Self {
            fields: Map::new(),
            dev: None,
        }
    }

    pub fn into_value(self) -> Value {
        let mut fields = self.fields;
        if let Some(dev) = self.dev {
            fields.insert(
                DEV_FIELD.to_string(),
                serde_json::to_value(dev).unwrap_or(Value::Null),
            );
        }
        Value::Object(fields)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        Json(self.into_value()).into_response()
    }
}
