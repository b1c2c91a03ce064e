//! HTTP Basic guard in front of the document routes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::AuthSettings;

use super::error::ApiError;

/// Accepted credentials. Only SHA-256 digests are retained.
pub struct BasicAuth {
    username_digest: Vec<u8>,
    password_digest: Vec<u8>,
}

/// A username/password pair made up at startup because none was configured.
#[derive(Debug, Clone)]
pub struct GeneratedCredentials {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username_digest: digest(username),
            password_digest: digest(password),
        }
    }

    /// Build the guard from settings, inventing a random pair when none is configured.
    pub fn from_settings(settings: &AuthSettings) -> (Self, Option<GeneratedCredentials>) {
        match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => (Self::new(username, password), None),
            _ => {
                let generated = GeneratedCredentials {
                    username: format!("ccc-{}", &Uuid::new_v4().simple().to_string()[..8]),
                    password: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
                };
                (
                    Self::new(&generated.username, &generated.password),
                    Some(generated),
                )
            }
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        let user_ok = self.username_digest.ct_eq(&digest(username));
        let pass_ok = self.password_digest.ct_eq(&digest(password));
        (user_ok & pass_ok).unwrap_u8() == 1
    }

    /// Check an `Authorization` header value of the form `Basic <base64>`.
    pub fn verify_header(&self, value: &HeaderValue) -> bool {
        match parse_basic(value) {
            Some((username, password)) => self.verify(&username, &password),
            None => false,
        }
    }
}

fn digest(value: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().to_vec()
}

fn parse_basic(value: &HeaderValue) -> Option<(String, String)> {
    let raw = value.to_str().ok()?;
    let (scheme, encoded) = raw.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

pub async fn require_basic_auth(
    State(auth): State<Arc<BasicAuth>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .is_some_and(|value| auth.verify_header(value));

    if !authorized {
        return ApiError::unauthorized().into_response();
    }

    next.run(request).await
}
