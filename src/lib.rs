//! Business capability mapping for parsed source code.
//!
//! capmap takes code artifacts produced by an upstream parser, asks an LLM
//! which capabilities from a fixed taxonomy each artifact exhibits, and
//! stores the answers as a small graph:
//!
//! | Node | Id | Carries |
//! |------|----|---------|
//! | **Capability** | capability name | display name, provenance |
//! | **Capability summary** | UUID v7 | model description, description embedding |
//!
//! Both node kinds link back to the source artifact through `related_to_id`.
//! Summary nodes get a cosine vector index and a full-text index.
//!
//! # Architecture
//!
//! - **Classification**: any OpenAI-compatible chat completions endpoint,
//!   one request per artifact, dispatched as an ordered batch
//! - **Validation**: strict JSON parsing, case-insensitive allow-list
//! - **Embeddings**: OpenAI-compatible embeddings endpoint, at most 100
//!   descriptions per request
//! - **Storage**: SQLite, with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   for vector search and FTS5 for keyword search
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization and schema
//! - [`error`]: Typed pipeline errors
//! - [`graph`]: Persisting and querying mapped nodes
//! - [`llm`]: Completion and embedding clients
//! - [`mapping`]: The mapping pipeline and index provisioning

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod llm;
pub mod mapping;
