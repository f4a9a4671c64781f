//! Read path over the capability graph and its search indexes.

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::db::{bytes_to_embedding, embedding_to_bytes};
use crate::mapping::index::{TEXT_INDEX_NAME, VECTOR_INDEX_NAME};

/// A stored node as read back from the `nodes` table.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub id: String,
    pub node_type: String,
    pub display_name: String,
    pub summary: String,
    pub summary_vector: Vec<f32>,
    pub generator: String,
    pub latest_update_generator: String,
    pub updated_at: String,
}

/// A summary hit from one of the search indexes.
#[derive(Debug, Clone)]
pub struct SummaryHit {
    pub id: String,
    pub display_name: String,
    pub summary: String,
    /// Artifacts the summary was written for.
    pub related_to_id: Vec<String>,
    /// BM25 rank (text search) or cosine distance (vector search). Lower is better.
    pub score: f64,
}

/// All nodes linked to `artifact_id`, capabilities first, then by name.
pub fn nodes_for_artifact(conn: &Connection, artifact_id: &str) -> Result<Vec<NodeRecord>> {
    let mut stmt = conn.prepare(
        "SELECT n.id, n.type, n.display_name, n.summary, n.summary_vector, \
                n.generator, n.latest_update_generator, n.updated_at \
         FROM nodes n JOIN node_relations r ON r.node_id = n.id \
         WHERE r.related_to_id = ?1 \
         ORDER BY n.type, n.display_name, n.id",
    )?;
    let rows = stmt
        .query_map(params![artifact_id], |row| {
            let vector: Option<Vec<u8>> = row.get(4)?;
            Ok(NodeRecord {
                id: row.get(0)?,
                node_type: row.get(1)?,
                display_name: row.get(2)?,
                summary: row.get(3)?,
                summary_vector: vector.as_deref().map(bytes_to_embedding).unwrap_or_default(),
                generator: row.get(5)?,
                latest_update_generator: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Keyword search over capability summaries via the full-text index.
pub fn text_search(conn: &Connection, query: &str, limit: usize) -> Result<Vec<SummaryHit>> {
    let escaped = escape_fts_query(query);
    if escaped.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT id, rank FROM {TEXT_INDEX_NAME} \
         WHERE {TEXT_INDEX_NAME} MATCH ?1 ORDER BY rank LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let ranked = stmt
        .query_map(params![escaped, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    hydrate(conn, ranked)
}

/// Nearest capability summaries to `embedding` via the vector index.
pub fn vector_search(conn: &Connection, embedding: &[f32], limit: usize) -> Result<Vec<SummaryHit>> {
    let sql = format!(
        "SELECT id, distance FROM {VECTOR_INDEX_NAME} \
         WHERE summary_vector MATCH ?1 ORDER BY distance LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let ranked = stmt
        .query_map(params![embedding_to_bytes(embedding), limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    hydrate(conn, ranked)
}

/// Attach node fields and artifact edges to ranked ids, keeping rank order.
fn hydrate(conn: &Connection, ranked: Vec<(String, f64)>) -> Result<Vec<SummaryHit>> {
    let mut node_stmt = conn.prepare("SELECT display_name, summary FROM nodes WHERE id = ?1")?;
    let mut rel_stmt = conn.prepare(
        "SELECT related_to_id FROM node_relations WHERE node_id = ?1 ORDER BY related_to_id",
    )?;

    let mut hits = Vec::with_capacity(ranked.len());
    for (id, score) in ranked {
        let (display_name, summary): (String, String) =
            node_stmt.query_row(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let related_to_id = rel_stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        hits.push(SummaryHit {
            id,
            display_name,
            summary,
            related_to_id,
            score,
        });
    }
    Ok(hits)
}

/// Escape a user query for FTS5 MATCH syntax.
///
/// Wraps each whitespace-delimited word in double quotes so FTS5 treats them
/// as plain terms (implicit AND).
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| format!("\"{}\"", word.replace('"', "")))
        .filter(|w| w != "\"\"")
        .collect::<Vec<_>>()
        .join(" ")
}
