mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use capmap::config::CapmapConfig;

#[derive(Parser)]
#[command(name = "capmap", version, about = "Map source code onto business capabilities")]
struct Cli {
    /// Config file to use instead of ~/.capmap/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify artifacts from a JSON file and store the capability graph
    Map {
        /// JSON array of {"id", "content"} objects
        artifacts: PathBuf,
    },
    /// Create the capability summary search indexes if missing
    Index,
    /// Show the capabilities mapped to an artifact
    Inspect {
        artifact_id: String,
    },
    /// Search capability summaries
    Search {
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Rank by embedding similarity instead of keywords
        #[arg(long)]
        semantic: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CapmapConfig::load_from(path)?,
        None => CapmapConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Map { artifacts } => cli::map::map(&config, &artifacts).await?,
        Command::Index => cli::index::index(&config)?,
        Command::Inspect { artifact_id } => cli::inspect::inspect(&config, &artifact_id)?,
        Command::Search {
            query,
            limit,
            semantic,
        } => cli::search::search(&config, &query, limit, semantic).await?,
    }

    Ok(())
}
