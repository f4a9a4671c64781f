//! The business capability mapping stage.
//!
//! [`CapabilityMapper::run`] is the single entry point. It builds one prompt
//! per artifact, dispatches them as one batch, validates every response
//! against the taxonomy, embeds the accepted descriptions in bounded chunks,
//! and assembles the capability and capability summary nodes. Nothing is
//! persisted here; callers hand the returned nodes to [`crate::graph::store`]
//! and then run [`index::provision_indexes`].

pub mod assemble;
pub mod batch;
pub mod index;
pub mod prompt;
pub mod response;
pub mod types;

use crate::error::MappingError;
use crate::llm::{CompletionClient, EmbeddingClient, PromptPair};

use prompt::PromptBuilder;
use response::{RejectedMatch, ResponseValidator};
use types::{CapabilityMatch, CodeArtifact, EnrichedNode, Taxonomy};

/// Provenance tag used when no generator is configured.
pub const DEFAULT_GENERATOR: &str = "business-capability-mapping";

/// Run-level knobs for [`CapabilityMapper`].
#[derive(Debug, Clone)]
pub struct MappingOptions {
    /// Natural language for the generated descriptions.
    pub language: String,
    /// Provenance tag. `None` falls back to [`DEFAULT_GENERATOR`].
    pub generator: Option<String>,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            language: "English".into(),
            generator: None,
        }
    }
}

/// Result of one mapping run.
#[derive(Debug, Default)]
pub struct MappingOutcome {
    /// Capability nodes followed by capability summary nodes.
    pub nodes: Vec<EnrichedNode>,
    pub matches: Vec<CapabilityMatch>,
    pub rejected: Vec<RejectedMatch>,
}

/// Maps code artifacts onto a fixed capability taxonomy.
#[derive(Debug, Clone)]
pub struct CapabilityMapper {
    prompts: PromptBuilder,
    validator: ResponseValidator,
    language: String,
    generator: String,
}

impl CapabilityMapper {
    /// Fails with [`MappingError::MissingCapabilities`] if the taxonomy is empty.
    pub fn new(taxonomy: &Taxonomy, options: MappingOptions) -> Result<Self, MappingError> {
        let prompts = PromptBuilder::new(taxonomy)?;
        let validator = ResponseValidator::new(taxonomy);
        let generator = options
            .generator
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GENERATOR.to_string());

        Ok(Self {
            prompts,
            validator,
            language: options.language,
            generator,
        })
    }

    pub fn generator(&self) -> &str {
        &self.generator
    }

    pub fn build_prompts(&self, artifacts: &[CodeArtifact]) -> Vec<PromptPair> {
        artifacts
            .iter()
            .map(|artifact| self.prompts.build(&artifact.content, &self.language))
            .collect()
    }

    /// Run the full mapping pipeline over `artifacts`.
    ///
    /// Any malformed response or transport failure fails the whole run and no
    /// nodes are returned. Dropping the returned future cancels in-flight
    /// requests.
    pub async fn run(
        &self,
        artifacts: &[CodeArtifact],
        completions: &dyn CompletionClient,
        embeddings: &dyn EmbeddingClient,
    ) -> Result<MappingOutcome, MappingError> {
        tracing::info!(
            artifacts = artifacts.len(),
            generator = %self.generator,
            "capability mapping started"
        );

        let prompts = self.build_prompts(artifacts);
        let responses = completions.complete_batch(&prompts).await?;
        if responses.len() != prompts.len() {
            return Err(MappingError::CompletionCountMismatch {
                expected: prompts.len(),
                actual: responses.len(),
            });
        }

        let validated = self.validator.validate(artifacts, &responses)?;
        tracing::info!(
            accepted = validated.matches.len(),
            rejected = validated.rejected.len(),
            "capability responses validated"
        );

        let descriptions: Vec<String> = validated
            .matches
            .iter()
            .map(|m| m.description.clone())
            .collect();
        let vectors = batch::embed_in_chunks(embeddings, &descriptions).await?;
        if vectors.len() != validated.matches.len() {
            return Err(MappingError::EmbeddingCountMismatch {
                expected: validated.matches.len(),
                actual: vectors.len(),
            });
        }

        let nodes = assemble::assemble_nodes(&validated.matches, &vectors, &self.generator);
        tracing::info!(nodes = nodes.len(), "capability mapping finished");

        Ok(MappingOutcome {
            nodes,
            matches: validated.matches,
            rejected: validated.rejected,
        })
    }
}
