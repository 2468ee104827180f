//! Configuration loading for the semantic memory store.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<config_dir>/semantic-memory/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::MemoryError;

/// Application name used for config, data and cache directories.
pub const APP_NAME: &str = "semantic-memory";

/// Which embedding backend produces vectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Local BERT model via Candle (all-MiniLM-L6-v2)
    #[default]
    Candle,
    /// Deterministic token hashing, no model download
    Hashing,
}

/// Embedding backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderSettings {
    /// Backend selection
    #[serde(default)]
    pub kind: EmbedderKind,

    /// Hugging Face repository for the Candle model
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    /// Model cache directory (None = platform cache dir)
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// Vector dimension for the hashing embedder.
    /// The Candle embedder reports its own dimension.
    #[serde(default = "default_hashing_dimension")]
    pub dimension: usize,
}

fn default_model_repo() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_hashing_dimension() -> usize {
    384
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::default(),
            model_repo: default_model_repo(),
            cache_dir: None,
            dimension: default_hashing_dimension(),
        }
    }
}

/// Ingestion adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Characters read from the head of a file to build its summary
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,

    /// Files (or directories) indexed by the bootstrap scan
    #[serde(default)]
    pub bootstrap_files: Vec<String>,

    /// File names never indexed by the event adapter
    #[serde(default = "default_ignored_names")]
    pub ignored_names: Vec<String>,
}

fn default_snippet_chars() -> usize {
    250
}

fn default_ignored_names() -> Vec<String> {
    vec![".env".to_string(), "venv".to_string(), ".git".to_string()]
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            snippet_chars: default_snippet_chars(),
            bootstrap_files: Vec::new(),
            ignored_names: default_ignored_names(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the vector snapshot, metadata snapshot and journal
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Journal entries accumulated before the store compacts into snapshots.
    /// 0 disables automatic compaction.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: usize,

    /// Maximum stored summary length in bytes
    #[serde(default = "default_max_summary_len")]
    pub max_summary_len: usize,

    /// Number of search results when the caller does not say
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Embedding backend
    #[serde(default)]
    pub embedder: EmbedderSettings,

    /// Ingestion adapters
    #[serde(default)]
    pub ingest: IngestSettings,
}

fn default_store_path() -> String {
    ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.data_local_dir().join("store"))
        .unwrap_or_else(|| PathBuf::from("./store"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_snapshot_interval() -> usize {
    64
}

fn default_max_summary_len() -> usize {
    1024
}

fn default_k() -> usize {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            log_level: default_log_level(),
            snapshot_interval: default_snapshot_interval(),
            max_summary_len: default_max_summary_len(),
            default_k: default_k(),
            embedder: EmbedderSettings::default(),
            ingest: IngestSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (`<config_dir>/semantic-memory/config.toml`)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (`MEMORY_*`, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, MemoryError> {
        let config_dir = ProjectDirs::from("", "", APP_NAME)
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("store_path", default_store_path())
            .map_err(config_err)?
            .set_default("log_level", default_log_level())
            .map_err(config_err)?
            .set_default("snapshot_interval", default_snapshot_interval() as i64)
            .map_err(config_err)?
            .set_default("max_summary_len", default_max_summary_len() as i64)
            .map_err(config_err)?
            .set_default("default_k", default_k() as i64)
            .map_err(config_err)?
            .set_default("embedder.model_repo", default_model_repo())
            .map_err(config_err)?
            .set_default("embedder.dimension", default_hashing_dimension() as i64)
            .map_err(config_err)?
            .set_default("ingest.snippet_chars", default_snippet_chars() as i64)
            .map_err(config_err)?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // MEMORY_STORE_PATH, MEMORY_EMBEDDER__KIND, MEMORY_INGEST__BOOTSTRAP_FILES=a,b
        builder = builder.add_source(
            Environment::with_prefix("MEMORY")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("ingest.bootstrap_files")
                .with_list_parse_key("ingest.ignored_names")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(config_err)?
            .try_deserialize()
            .map_err(config_err)?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.store_path.trim().is_empty() {
            return Err(MemoryError::InvalidSetting("store_path must not be empty".to_string()));
        }
        if self.max_summary_len == 0 {
            return Err(MemoryError::InvalidSetting("max_summary_len must be > 0".to_string()));
        }
        if self.default_k == 0 {
            return Err(MemoryError::InvalidSetting("default_k must be > 0".to_string()));
        }
        if self.embedder.kind == EmbedderKind::Hashing && self.embedder.dimension == 0 {
            return Err(MemoryError::InvalidSetting(
                "embedder.dimension must be > 0 for the hashing embedder".to_string(),
            ));
        }
        if self.ingest.snippet_chars == 0 {
            return Err(MemoryError::InvalidSetting("ingest.snippet_chars must be > 0".to_string()));
        }
        Ok(())
    }

    /// Store directory with `~` and environment variables expanded.
    pub fn expanded_store_path(&self) -> PathBuf {
        expand_path(&self.store_path)
    }

    /// Model cache directory with `~` expanded, if configured.
    pub fn expanded_cache_dir(&self) -> Option<PathBuf> {
        self.embedder.cache_dir.as_deref().map(expand_path)
    }

    /// Bootstrap entries with `~` expanded.
    pub fn expanded_bootstrap_files(&self) -> Vec<PathBuf> {
        self.ingest
            .bootstrap_files
            .iter()
            .map(|p| expand_path(p))
            .collect()
    }
}

/// Expand `~` and `$VARS`; fall back to the raw string if expansion fails.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

fn config_err(e: config::ConfigError) -> MemoryError {
    MemoryError::Config(e.to_string())
}
