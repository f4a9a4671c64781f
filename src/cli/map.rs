//! CLI `map` command: classify artifacts, persist the nodes, index them.

use anyhow::{Context, Result};
use std::path::Path;

use capmap::config::CapmapConfig;
use capmap::db;
use capmap::graph::store::persist_nodes;
use capmap::llm;
use capmap::mapping::index::provision_indexes;
use capmap::mapping::types::Taxonomy;
use capmap::mapping::{CapabilityMapper, MappingOptions};

/// Run the capability mapping stage over the artifacts in `artifacts_path`.
pub async fn map(config: &CapmapConfig, artifacts_path: &Path) -> Result<()> {
    let taxonomy = Taxonomy::new(
        &config.mapping.capabilities,
        &config.mapping.capabilities_descriptions,
    );
    let mapper = CapabilityMapper::new(
        &taxonomy,
        MappingOptions {
            language: config.mapping.language.clone(),
            generator: config.mapping.generator.clone(),
        },
    )
    .context("invalid mapping configuration")?;

    let artifacts = super::load_artifacts(artifacts_path)?;
    if artifacts.is_empty() {
        println!("No artifacts to map.");
        return Ok(());
    }

    let completions = llm::create_completion_client(&config.llm)
        .context("failed to create completion client")?;
    let embeddings = llm::create_embedding_client(&config.embedding, config.llm.timeout_secs)
        .context("failed to create embedding client")?;

    println!(
        "Mapping {} artifacts onto {} capabilities...",
        artifacts.len(),
        taxonomy.len()
    );

    let outcome = mapper
        .run(&artifacts, completions.as_ref(), embeddings.as_ref())
        .await?;

    let mut conn = db::open_database(config.resolved_db_path()).context("failed to open database")?;
    let persisted = persist_nodes(&mut conn, &outcome.nodes)?;

    // Nodes are committed at this point; a failed index only slows search.
    let index_report = match provision_indexes(&conn, config.embedding.dimensions) {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!(error = %e, "index provisioning failed, mapped nodes are stored");
            None
        }
    };

    let usage = completions.usage();

    println!("Capability Mapping");
    println!("{}", "=".repeat(40));
    println!("  Artifacts:           {}", artifacts.len());
    println!("  Accepted matches:    {}", outcome.matches.len());
    println!("  Rejected matches:    {}", outcome.rejected.len());
    println!("  Capabilities new:    {}", persisted.capabilities_created);
    println!("  Capabilities merged: {}", persisted.capabilities_merged);
    println!("  Summaries written:   {}", persisted.summaries_created);
    println!("  Tokens used:         {}", usage.total());
    match index_report {
        Some(report) => println!(
            "  Indexed:             {} vectors, {} texts",
            report.vector_rows_added, report.text_rows_added
        ),
        None => println!("  Indexed:             failed (run `capmap index` to retry)"),
    }

    Ok(())
}
