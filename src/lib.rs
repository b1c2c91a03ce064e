//! Cache-aside HTTP façade for CouchDB-compatible document stores.
//!
//! Reads are served from a memcached-style cache when possible and fall
//! through to the backend otherwise. Writes go to the backend first and are
//! then copied into the cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
