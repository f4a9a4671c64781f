//! SQLite-backed capability graph: writing mapped nodes and reading them back.

pub mod query;
pub mod store;
