//! Prompt construction for capability classification.

use crate::error::MappingError;
use crate::llm::PromptPair;
use crate::mapping::types::Taxonomy;

const SYSTEM_TEMPLATE: &str = "\
You are a software analyst who maps source code onto business capabilities.

You will be given a list of allowed business capabilities and one piece of source code.
Decide which of the allowed capabilities the code implements or directly supports.

Rules:
- Only use capability names exactly as they appear in the allowed list.
- Do not invent capabilities. If nothing fits, return an empty list.
- For every match, write a short description in {language} explaining how the code supports that capability.

Respond with a single JSON object and nothing else, in this shape:
{\"matched_capabilities\": [{\"capability\": \"<capability name>\", \"description\": \"<why the code matches>\"}]}";

/// Renders the system/user prompt pair for one artifact.
///
/// The capability list section is rendered once at construction; only the
/// artifact content and language vary per call.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    capability_list: String,
}

impl PromptBuilder {
    /// Fails with [`MappingError::MissingCapabilities`] if the taxonomy is empty.
    pub fn new(taxonomy: &Taxonomy) -> Result<Self, MappingError> {
        if taxonomy.is_empty() {
            return Err(MappingError::MissingCapabilities);
        }

        let capability_list = taxonomy
            .entries()
            .iter()
            .map(|entry| match &entry.description {
                Some(description) => format!("- {}: {}", entry.name, description),
                None => format!("- {}", entry.name),
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Self { capability_list })
    }

    pub fn build(&self, file_content: &str, language: &str) -> PromptPair {
        let system = SYSTEM_TEMPLATE.replace("{language}", language);
        let user = format!(
            "Allowed business capabilities:\n{}\n\nSource code:\n```\n{}\n```",
            self.capability_list, file_content
        );
        PromptPair { system, user }
    }
}
