//! Infrastructure adapters and runtime bootstrap.

pub mod couchdb;
pub mod error;
pub mod http;
pub mod telemetry;
