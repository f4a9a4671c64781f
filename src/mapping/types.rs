//! Mapping input and output types.
//!
//! Defines [`CodeArtifact`] (pipeline input), [`Taxonomy`] (the capability
//! allow-list), [`CapabilityMatch`] (a validated association), and the two
//! emitted graph node kinds wrapped in [`EnrichedNode`].

use serde::{Deserialize, Serialize};

/// A parsed unit of source code handed to the mapping stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    /// Stable identifier of the upstream code node.
    pub id: String,
    /// Source text shown to the model.
    pub content: String,
}

impl CodeArtifact {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// One entry of the capability taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDef {
    pub name: String,
    pub description: Option<String>,
}

/// Ordered capability allow-list, immutable for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    entries: Vec<CapabilityDef>,
}

impl Taxonomy {
    /// Pair names with descriptions by position. Missing or blank
    /// descriptions become `None`; extra descriptions are ignored.
    pub fn new(names: &[String], descriptions: &[String]) -> Self {
        let entries = names
            .iter()
            .enumerate()
            .map(|(i, name)| CapabilityDef {
                name: name.clone(),
                description: descriptions
                    .get(i)
                    .filter(|d| !d.trim().is_empty())
                    .cloned(),
            })
            .collect();
        Self { entries }
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        Self::new(&names, &[])
    }

    pub fn entries(&self) -> &[CapabilityDef] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A validated (artifact, capability, description) association.
///
/// `capability` keeps the spelling the model reported; only the allow-list
/// comparison is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityMatch {
    pub artifact_id: String,
    pub capability: String,
    pub description: String,
}

/// Graph node labels emitted by the mapping stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// "This artifact exhibits capability X."
    Capability,
    /// The model's justification text and its embedding.
    CapabilitySummary,
}

impl NodeType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Capability => "capability",
            Self::CapabilitySummary => "capability_summary",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "capability" => Ok(Self::Capability),
            "capability_summary" => Ok(Self::CapabilitySummary),
            _ => Err(format!("unknown node type: {s}")),
        }
    }
}

/// Which process created and last touched a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub generator: String,
    pub latest_update_generator: String,
}

impl Provenance {
    pub fn new(generator: &str) -> Self {
        Self {
            generator: generator.to_string(),
            latest_update_generator: generator.to_string(),
        }
    }
}

/// A capability node. Its id is the capability name, so the same capability
/// reported for several artifacts converges on one stored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityNode {
    pub id: String,
    /// Always empty here; filled by a later enrichment step.
    pub summary: String,
    /// Always empty here; the summary node carries the embedding.
    pub summary_vector: Vec<f32>,
    pub related_to_id: Vec<String>,
    pub display_name: String,
    #[serde(flatten)]
    pub provenance: Provenance,
}

/// A capability summary node: the model's description of why an artifact
/// matches a capability, plus its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySummaryNode {
    /// Fresh UUID v7.
    pub id: String,
    pub summary: String,
    pub summary_vector: Vec<f32>,
    pub related_to_id: Vec<String>,
    pub source_content: String,
    pub code_vector: Vec<f32>,
    pub display_name: String,
    #[serde(flatten)]
    pub provenance: Provenance,
}

/// A node produced by the mapping stage, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnrichedNode {
    Capability(CapabilityNode),
    CapabilitySummary(CapabilitySummaryNode),
}

impl EnrichedNode {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Capability(_) => NodeType::Capability,
            Self::CapabilitySummary(_) => NodeType::CapabilitySummary,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Capability(n) => &n.id,
            Self::CapabilitySummary(n) => &n.id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Capability(n) => &n.display_name,
            Self::CapabilitySummary(n) => &n.display_name,
        }
    }

    pub fn related_to_id(&self) -> &[String] {
        match self {
            Self::Capability(n) => &n.related_to_id,
            Self::CapabilitySummary(n) => &n.related_to_id,
        }
    }

    pub fn provenance(&self) -> &Provenance {
        match self {
            Self::Capability(n) => &n.provenance,
            Self::CapabilitySummary(n) => &n.provenance,
        }
    }
}
