//! CLI `index` command: create or refresh the capability summary indexes.

use anyhow::Result;

use capmap::config::CapmapConfig;
use capmap::mapping::index::provision_indexes;

pub fn index(config: &CapmapConfig) -> Result<()> {
    let conn = capmap::db::open_database(config.resolved_db_path())?;
    let report = provision_indexes(&conn, config.embedding.dimensions)?;

    println!(
        "Indexes ready ({} dimensions, cosine): {} vectors and {} texts added.",
        config.embedding.dimensions, report.vector_rows_added, report.text_rows_added
    );
    Ok(())
}
