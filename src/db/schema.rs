//! SQL DDL for the capability graph.
//!
//! Defines the `nodes` table (capability and capability summary nodes) and
//! `node_relations` (node → source artifact edges). All DDL uses
//! `IF NOT EXISTS`. The search indexes over summary nodes are created later
//! by [`crate::mapping::index`].

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Graph nodes emitted by the mapping stage
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL CHECK(type IN ('capability','capability_summary')),
    display_name TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    summary_vector BLOB,
    source_content TEXT NOT NULL DEFAULT '',
    generator TEXT NOT NULL,
    latest_update_generator TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(type);
CREATE INDEX IF NOT EXISTS idx_nodes_display_name ON nodes(display_name);

-- related_to_id edges
CREATE TABLE IF NOT EXISTS node_relations (
    node_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    related_to_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (node_id, related_to_id)
);

CREATE INDEX IF NOT EXISTS idx_relations_related ON node_relations(related_to_id);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"nodes".to_string()));
        assert!(tables.contains(&"node_relations".to_string()));

        // sqlite-vec is available for the index provisioner
        let version: String = conn
            .query_row("SELECT vec_version()", [], |r| r.get(0))
            .unwrap();
        assert!(!version.is_empty());
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn unknown_node_type_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO nodes (id, type, display_name, generator, latest_update_generator, created_at, updated_at) \
             VALUES ('x', 'code_summary', 'x', 'g', 'g', 'now', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
