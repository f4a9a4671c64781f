//! Turns validated matches and their embeddings into graph nodes.

use crate::mapping::types::{
    CapabilityMatch, CapabilityNode, CapabilitySummaryNode, EnrichedNode, Provenance,
};

/// Build two nodes per match: all capability nodes first, then all summary
/// nodes, each group in match order.
///
/// `embeddings[i]` must belong to `matches[i]`; the caller checks the lengths.
pub fn assemble_nodes(
    matches: &[CapabilityMatch],
    embeddings: &[Vec<f32>],
    generator: &str,
) -> Vec<EnrichedNode> {
    debug_assert_eq!(matches.len(), embeddings.len());

    let provenance = Provenance::new(generator);
    let mut nodes = Vec::with_capacity(matches.len() * 2);

    nodes.extend(matches.iter().map(|m| {
        EnrichedNode::Capability(CapabilityNode {
            id: m.capability.clone(),
            summary: String::new(),
            summary_vector: Vec::new(),
            related_to_id: vec![m.artifact_id.clone()],
            display_name: m.capability.clone(),
            provenance: provenance.clone(),
        })
    }));

    nodes.extend(matches.iter().zip(embeddings).map(|(m, embedding)| {
        EnrichedNode::CapabilitySummary(CapabilitySummaryNode {
            id: uuid::Uuid::now_v7().to_string(),
            summary: m.description.clone(),
            summary_vector: embedding.clone(),
            related_to_id: vec![m.artifact_id.clone()],
            source_content: String::new(),
            code_vector: Vec::new(),
            display_name: m.capability.clone(),
            provenance: provenance.clone(),
        })
    }));

    nodes
}
