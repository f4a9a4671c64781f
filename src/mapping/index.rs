//! Search index provisioning for capability summary nodes.
//!
//! Runs after nodes are persisted. Both indexes are created with
//! `IF NOT EXISTS` and only pick up summary rows they do not already hold,
//! so provisioning can be repeated freely. The indexes are derived data: a
//! vector table declared with other dimensions than requested is dropped
//! and rebuilt from `nodes`.

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};

use crate::error::MappingError;
use crate::mapping::types::NodeType;

pub const VECTOR_INDEX_NAME: &str = "capability_summary_embeddings";
pub const TEXT_INDEX_NAME: &str = "capability_summary_text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Similarity {
    Cosine,
}

impl Similarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
        }
    }
}

/// One "create if not exists" index operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRequest {
    Vector {
        name: &'static str,
        field: &'static str,
        dimensions: usize,
        similarity: Similarity,
    },
    FullText {
        name: &'static str,
        field: &'static str,
    },
}

impl IndexRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vector { name, .. } | Self::FullText { name, .. } => *name,
        }
    }

    /// DDL creating the index table.
    fn create_sql(&self) -> String {
        match self {
            Self::Vector {
                name,
                field,
                dimensions,
                similarity,
            } => format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS {name} USING vec0(\
                 id TEXT PRIMARY KEY, \
                 {field} FLOAT[{dimensions}] distance_metric={})",
                similarity.as_str()
            ),
            Self::FullText { name, field } => format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS {name} USING fts5({field}, id UNINDEXED)"
            ),
        }
    }

    /// Copy summary rows missing from the index into it.
    fn sync_sql(&self) -> String {
        let node_type = NodeType::CapabilitySummary.as_str();
        match self {
            Self::Vector { name, field, .. } => format!(
                "INSERT INTO {name} (id, {field}) \
                 SELECT id, {field} FROM nodes \
                 WHERE type = '{node_type}' AND length({field}) > 0 \
                 AND id NOT IN (SELECT id FROM {name})"
            ),
            Self::FullText { name, field } => format!(
                "INSERT INTO {name} ({field}, id) \
                 SELECT {field}, id FROM nodes \
                 WHERE type = '{node_type}' \
                 AND id NOT IN (SELECT id FROM {name})"
            ),
        }
    }
}

/// The two indexes the capability summary type needs.
pub fn index_requests(dimensions: usize) -> [IndexRequest; 2] {
    [
        IndexRequest::Vector {
            name: VECTOR_INDEX_NAME,
            field: "summary_vector",
            dimensions,
            similarity: Similarity::Cosine,
        },
        IndexRequest::FullText {
            name: TEXT_INDEX_NAME,
            field: "summary",
        },
    ]
}

/// Rows added to each index by one provisioning pass.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub vector_rows_added: usize,
    pub text_rows_added: usize,
}

/// Create both indexes if missing and index any new summary rows.
///
/// Each index is provisioned independently. If either fails the call
/// returns an error naming every failure, after the other has still been
/// attempted.
pub fn provision_indexes(conn: &Connection, dimensions: usize) -> Result<IndexReport, MappingError> {
    if dimensions == 0 {
        return Err(MappingError::IndexProvisioning(anyhow::anyhow!(
            "vector dimensions must be greater than zero"
        )));
    }

    let mut report = IndexReport::default();
    let mut failures: Vec<anyhow::Error> = Vec::new();

    for request in index_requests(dimensions) {
        match apply_request(conn, &request) {
            Ok(added) => {
                match &request {
                    IndexRequest::Vector { .. } => report.vector_rows_added = added,
                    IndexRequest::FullText { .. } => report.text_rows_added = added,
                }
                tracing::info!(index = request.name(), rows_added = added, "index provisioned");
            }
            Err(e) => {
                tracing::error!(index = request.name(), error = %format!("{e:#}"), "index provisioning failed");
                failures.push(e);
            }
        }
    }

    match failures.len() {
        0 => Ok(report),
        1 => Err(MappingError::IndexProvisioning(failures.remove(0))),
        _ => {
            let joined = failures
                .iter()
                .map(|e| format!("{e:#}"))
                .collect::<Vec<_>>()
                .join("; ");
            Err(MappingError::IndexProvisioning(anyhow::anyhow!(joined)))
        }
    }
}

fn apply_request(conn: &Connection, request: &IndexRequest) -> anyhow::Result<usize> {
    let name = request.name();

    if let IndexRequest::Vector {
        field, dimensions, ..
    } = request
    {
        if let Some(declared) = declared_dimensions(conn, name, field)? {
            if declared != *dimensions {
                tracing::warn!(
                    index = name,
                    declared,
                    requested = *dimensions,
                    "vector index dimensions changed, rebuilding"
                );
                conn.execute_batch(&format!("DROP TABLE {name}"))
                    .with_context(|| format!("failed to drop stale index {name}"))?;
            }
        }
    }

    conn.execute_batch(&request.create_sql())
        .with_context(|| format!("failed to create index {name}"))?;

    let before = row_count(conn, name)?;
    conn.execute(&request.sync_sql(), [])
        .with_context(|| format!("failed to populate index {name}"))?;
    let after = row_count(conn, name)?;

    Ok(after.saturating_sub(before))
}

/// The `FLOAT[n]` width of `field` in an existing vec0 table, if the table exists.
fn declared_dimensions(conn: &Connection, table: &str, field: &str) -> anyhow::Result<Option<usize>> {
    let sql: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    let Some(sql) = sql else {
        return Ok(None);
    };

    let ddl = sql.to_ascii_lowercase();
    let marker = format!("{field} float[");
    let start = ddl
        .find(&marker)
        .map(|pos| pos + marker.len())
        .with_context(|| format!("index {table} has no {field} column"))?;
    let end = ddl[start..]
        .find(']')
        .map(|pos| start + pos)
        .with_context(|| format!("index {table} has an unterminated vector type"))?;
    let dims = ddl[start..end]
        .trim()
        .parse()
        .with_context(|| format!("index {table} declares invalid dimensions"))?;
    Ok(Some(dims))
}

fn row_count(conn: &Connection, table: &str) -> anyhow::Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(count as usize)
}
