//! Application services: the cache-aside orchestration and its error taxonomy.

pub mod documents;
pub mod error;
pub mod repos;
