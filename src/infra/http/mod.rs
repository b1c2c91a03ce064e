//! HTTP surface: routing, Basic guard, request validation and response envelopes.

mod auth;
mod envelope;
mod error;
mod extract;
mod handlers;
mod middleware;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};

use crate::application::documents::DocumentService;

pub use auth::{BasicAuth, GeneratedCredentials};
pub use envelope::{DEV_FIELD, DevMetadata, Envelope};
pub use error::ApiError;
pub use extract::{DocumentPath, TtlQuery};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};

#[derive(Clone)]
pub struct HttpState {
    pub documents: Arc<DocumentService>,
    pub auth: Arc<BasicAuth>,
    /// Include the `_dev` block in document responses.
    pub expose_dev_metadata: bool,
}

pub fn build_router(state: HttpState, max_request_bytes: usize) -> Router {
    let guarded = Router::new()
        .route("/auth", get(handlers::auth_probe))
        .route(
            "/{collection}/{id}",
            get(handlers::read_document)
                .put(handlers::promote_document)
                .post(handlers::upsert_document)
                .delete(handlers::invalidate_document),
        )
        .route_layer(from_fn_with_state(
            state.auth.clone(),
            auth::require_basic_auth,
        ));

    Router::new()
        .route("/_health", get(handlers::health))
        .merge(guarded)
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .with_state(state)
        .layer(from_fn(middleware::log_responses))
        .layer(from_fn(middleware::set_request_context))
}
