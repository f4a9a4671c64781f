//! Write path for mapped nodes.
//!
//! [`persist_nodes`] writes a full mapping run inside one transaction.
//! Capability nodes are keyed by capability name, so a capability seen again
//! is merged: its provenance and timestamp are refreshed and the new artifact
//! edge is added. Summary nodes are always new rows.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::db::embedding_to_bytes;
use crate::mapping::types::{CapabilityNode, CapabilitySummaryNode, EnrichedNode, NodeType};

/// Counts returned from a persist operation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PersistResult {
    pub capabilities_created: usize,
    pub capabilities_merged: usize,
    pub summaries_created: usize,
    /// New `related_to_id` edges (duplicates are ignored).
    pub relations_created: usize,
}

/// Persist every node from a mapping run. All-or-nothing.
pub fn persist_nodes(conn: &mut Connection, nodes: &[EnrichedNode]) -> Result<PersistResult> {
    let tx = conn.transaction()?;
    let now = chrono::Utc::now().to_rfc3339();
    let mut result = PersistResult::default();

    for node in nodes {
        match node {
            EnrichedNode::Capability(cap) => {
                if upsert_capability(&tx, cap, &now)? {
                    result.capabilities_created += 1;
                } else {
                    result.capabilities_merged += 1;
                }
            }
            EnrichedNode::CapabilitySummary(summary) => {
                insert_summary(&tx, summary, &now)
                    .with_context(|| format!("failed to insert summary node {}", summary.id))?;
                result.summaries_created += 1;
            }
        }

        for related in node.related_to_id() {
            result.relations_created += insert_relation(&tx, node.id(), related, &now)?;
        }
    }

    tx.commit()?;

    tracing::info!(
        capabilities_created = result.capabilities_created,
        capabilities_merged = result.capabilities_merged,
        summaries_created = result.summaries_created,
        relations_created = result.relations_created,
        "nodes persisted"
    );

    Ok(result)
}

/// Insert a capability node or refresh the existing one. Returns `true` if
/// a new row was created.
fn upsert_capability(tx: &Transaction, node: &CapabilityNode, now: &str) -> Result<bool> {
    let existing: Option<String> = tx
        .query_row(
            "SELECT type FROM nodes WHERE id = ?1",
            params![node.id],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(node_type) => {
            anyhow::ensure!(
                node_type == NodeType::Capability.as_str(),
                "node id {} already exists with type {node_type}",
                node.id
            );
            tx.execute(
                "UPDATE nodes SET latest_update_generator = ?1, updated_at = ?2 WHERE id = ?3",
                params![node.provenance.latest_update_generator, now, node.id],
            )?;
            Ok(false)
        }
        None => {
            let vector = (!node.summary_vector.is_empty())
                .then(|| embedding_to_bytes(&node.summary_vector));
            tx.execute(
                "INSERT INTO nodes (id, type, display_name, summary, summary_vector, source_content, \
                 generator, latest_update_generator, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, '', ?6, ?7, ?8, ?8)",
                params![
                    node.id,
                    NodeType::Capability.as_str(),
                    node.display_name,
                    node.summary,
                    vector,
                    node.provenance.generator,
                    node.provenance.latest_update_generator,
                    now,
                ],
            )?;
            Ok(true)
        }
    }
}

fn insert_summary(tx: &Transaction, node: &CapabilitySummaryNode, now: &str) -> Result<()> {
    tx.execute(
        "INSERT INTO nodes (id, type, display_name, summary, summary_vector, source_content, \
         generator, latest_update_generator, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            node.id,
            NodeType::CapabilitySummary.as_str(),
            node.display_name,
            node.summary,
            embedding_to_bytes(&node.summary_vector),
            node.source_content,
            node.provenance.generator,
            node.provenance.latest_update_generator,
            now,
        ],
    )?;
    Ok(())
}

/// Returns 1 if the edge was new, 0 if it already existed.
fn insert_relation(tx: &Transaction, node_id: &str, related_to_id: &str, now: &str) -> Result<usize> {
    let rows = tx.execute(
        "INSERT OR IGNORE INTO node_relations (node_id, related_to_id, created_at) VALUES (?1, ?2, ?3)",
        params![node_id, related_to_id, now],
    )?;
    Ok(rows)
}
