//! CLI `search` command: query capability summaries.

use anyhow::{Context, Result};

use capmap::config::CapmapConfig;
use capmap::graph::query::{text_search, vector_search};

/// Search summaries by keyword, or by embedding similarity with `semantic`.
pub async fn search(config: &CapmapConfig, query: &str, limit: usize, semantic: bool) -> Result<()> {
    let conn = capmap::db::open_database(config.resolved_db_path())?;

    let hits = if semantic {
        let client = capmap::llm::create_embedding_client(&config.embedding, config.llm.timeout_secs)?;
        let embedding = client
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .context("embedding client returned no vector for the query")?;
        vector_search(&conn, &embedding, limit)?
    } else {
        text_search(&conn, query, limit)?
    };

    if hits.is_empty() {
        println!("No matching capability summaries.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [{}] {:.4}", i + 1, hit.display_name, hit.score);
        println!("   {}", hit.summary);
        println!("   artifacts: {}", hit.related_to_id.join(", "));
    }

    Ok(())
}
