use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CapmapConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub mapping: MappingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Upper bound on in-flight completion requests within one batch.
    pub max_concurrency: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MappingConfig {
    /// The capability allow-list. Must not be empty for `capmap map`.
    pub capabilities: Vec<String>,
    /// Optional descriptions, paired with `capabilities` by position.
    pub capabilities_descriptions: Vec<String>,
    /// Natural language the model should write descriptions in.
    pub language: String,
    /// Provenance tag for emitted nodes. Falls back to the stage name.
    pub generator: Option<String>,
}

impl Default for CapmapConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            mapping: MappingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_capmap_dir()
            .join("graph.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: 0.0,
            timeout_secs: 120,
            max_concurrency: 8,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            base_url: "https://api.openai.com/v1".into(),
            model: "text-embedding-3-small".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            dimensions: 1536,
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            capabilities: Vec::new(),
            capabilities_descriptions: Vec::new(),
            language: "English".into(),
            generator: None,
        }
    }
}

/// Returns `~/.capmap/`
pub fn default_capmap_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".capmap")
}

/// Returns the default config file path: `~/.capmap/config.toml`
pub fn default_config_path() -> PathBuf {
    default_capmap_dir().join("config.toml")
}

impl CapmapConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CapmapConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (CAPMAP_DB, CAPMAP_LOG_LEVEL, CAPMAP_LANGUAGE, CAPMAP_GENERATOR).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CAPMAP_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("CAPMAP_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("CAPMAP_LANGUAGE") {
            self.mapping.language = val;
        }
        if let Ok(val) = std::env::var("CAPMAP_GENERATOR") {
            self.mapping.generator = Some(val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
