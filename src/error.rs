//! Typed errors for the mapping pipeline.
//!
//! Application layers (CLI, config, store) use `anyhow`. The pipeline itself
//! returns [`MappingError`] so callers can tell a bad configuration or a
//! malformed model response apart from a transport failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    /// The capability taxonomy was empty at construction time.
    #[error("capabilities is required in the mapping configuration")]
    MissingCapabilities,

    /// A completion's content was not the expected structured payload.
    #[error("malformed capability response for artifact {artifact_id}: {reason}")]
    MalformedResponse { artifact_id: String, reason: String },

    #[error("completion dispatcher returned {actual} responses for {expected} prompts")]
    CompletionCountMismatch { expected: usize, actual: usize },

    #[error("embedding client returned {actual} vectors for {expected} texts")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    /// Completion or embedding transport failure, passed through untouched.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),

    #[error("index provisioning failed: {0:#}")]
    IndexProvisioning(#[source] anyhow::Error),
}
