//! CLI `inspect` command: show the capabilities mapped to one artifact.

use anyhow::Result;

use capmap::config::CapmapConfig;
use capmap::mapping::types::NodeType;

/// Inspect all capability nodes linked to an artifact.
pub fn inspect(config: &CapmapConfig, artifact_id: &str) -> Result<()> {
    let conn = capmap::db::open_database(config.resolved_db_path())?;
    let nodes = capmap::graph::query::nodes_for_artifact(&conn, artifact_id)?;

    if nodes.is_empty() {
        println!("No capabilities mapped to {artifact_id}.");
        return Ok(());
    }

    println!("Artifact: {artifact_id}");
    println!("{}", "=".repeat(50));

    let summary_type = NodeType::CapabilitySummary.as_str();
    for node in nodes.iter().filter(|n| n.node_type != summary_type) {
        println!("  {} (generator: {})", node.display_name, node.latest_update_generator);
        for summary in nodes
            .iter()
            .filter(|n| n.node_type == summary_type && n.display_name == node.display_name)
        {
            println!("    - {}", summary.summary);
            println!("      id: {}  updated: {}", summary.id, summary.updated_at);
        }
    }

    Ok(())
}
