//! Local copies of the embedding model files.
//!
//! Files live under `<cache root>/<org>--<model>/`. Only files missing from
//! that directory are fetched from the Hugging Face Hub, and each one is
//! written under a `.part` name first so an interrupted fetch is never
//! mistaken for a cached file.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use memory_types::APP_NAME;

use crate::error::EmbeddingError;

/// Model used when settings do not name one
pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Files a BERT embedder needs
pub const MODEL_FILES: &[&str] = &[CONFIG_FILE, TOKENIZER_FILE, WEIGHTS_FILE];

/// Where one model repository is cached.
#[derive(Debug, Clone)]
pub struct ModelCache {
    root: PathBuf,
    repo_id: String,
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::for_repo(DEFAULT_MODEL_REPO)
    }
}

impl ModelCache {
    pub fn new(root: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            repo_id: repo_id.into(),
        }
    }

    /// `repo_id` under the platform cache directory.
    pub fn for_repo(repo_id: impl Into<String>) -> Self {
        Self::new(platform_cache_root(), repo_id)
    }

    /// `repo_id` under `root` when configured, else the platform directory.
    pub fn from_settings(repo_id: impl Into<String>, root: Option<PathBuf>) -> Self {
        match root {
            Some(root) => Self::new(root, repo_id),
            None => Self::for_repo(repo_id),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    /// Model name without the organisation prefix
    pub fn model_name(&self) -> &str {
        self.repo_id
            .rsplit('/')
            .next()
            .unwrap_or(self.repo_id.as_str())
    }

    pub fn model_dir(&self) -> PathBuf {
        self.root.join(self.repo_id.replace('/', "--"))
    }

    pub fn paths(&self) -> ModelPaths {
        ModelPaths::in_dir(&self.model_dir())
    }

    /// Required files not yet present in the model directory.
    pub fn missing_files(&self) -> Vec<&'static str> {
        let dir = self.model_dir();
        MODEL_FILES
            .iter()
            .copied()
            .filter(|file| !dir.join(file).is_file())
            .collect()
    }
}

fn platform_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(APP_NAME)
        .join("models")
}

/// Resolved model file locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights: dir.join(WEIGHTS_FILE),
        }
    }
}

/// Make sure every model file is cached, fetching the missing ones.
pub fn ensure_model_files(cache: &ModelCache) -> Result<ModelPaths, EmbeddingError> {
    if cache.repo_id.trim().is_empty() {
        return Err(EmbeddingError::InvalidInput(
            "model repository must not be empty".to_string(),
        ));
    }

    let missing = cache.missing_files();
    if missing.is_empty() {
        debug!(dir = ?cache.model_dir(), "Model files cached");
        return Ok(cache.paths());
    }

    info!(repo = %cache.repo_id, missing = ?missing, "Fetching model files");
    let api = hf_hub::api::sync::Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
    let repo = api.model(cache.repo_id.clone());

    let dir = cache.model_dir();
    std::fs::create_dir_all(&dir)?;
    for file in missing {
        let source = repo
            .get(file)
            .map_err(|e| EmbeddingError::Download(format!("{}: {}", file, e)))?;
        store_file(&source, &dir, file)?;
    }

    Ok(cache.paths())
}

/// Copy a fetched file into the model directory via a `.part` name.
fn store_file(source: &Path, dir: &Path, file: &str) -> Result<(), EmbeddingError> {
    let partial = dir.join(format!("{file}.part"));
    let dest = dir.join(file);
    std::fs::copy(source, &partial)?;
    std::fs::rename(&partial, &dest)?;
    debug!(file, dest = ?dest, "Cached model file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fill(cache: &ModelCache, files: &[&str]) {
        std::fs::create_dir_all(cache.model_dir()).unwrap();
        for file in files {
            std::fs::write(cache.model_dir().join(file), b"{}").unwrap();
        }
    }

    #[test]
    fn test_default_cache_location() {
        let cache = ModelCache::default();
        assert!(cache.root().to_string_lossy().contains(APP_NAME));
        assert_eq!(cache.repo_id(), DEFAULT_MODEL_REPO);
        assert_eq!(cache.model_name(), "all-MiniLM-L6-v2");
        assert!(cache
            .model_dir()
            .ends_with("sentence-transformers--all-MiniLM-L6-v2"));
    }

    #[test]
    fn test_from_settings_prefers_configured_root() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::from_settings("org/model", Some(temp.path().to_path_buf()));
        assert_eq!(cache.root(), temp.path());
        assert_eq!(cache.model_dir(), temp.path().join("org--model"));

        let platform = ModelCache::from_settings("org/model", None);
        assert_eq!(platform.root(), platform_cache_root().as_path());
    }

    #[test]
    fn test_missing_files_reports_only_absent() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "org/model");
        assert_eq!(cache.missing_files(), MODEL_FILES.to_vec());

        fill(&cache, &[CONFIG_FILE]);
        // A partial fetch does not count as cached
        std::fs::write(cache.model_dir().join("model.safetensors.part"), b"x").unwrap();
        assert_eq!(cache.missing_files(), vec![TOKENIZER_FILE, WEIGHTS_FILE]);
    }

    #[test]
    fn test_ensure_uses_cached_files_without_fetching() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "org/model");
        fill(&cache, MODEL_FILES);

        let paths = ensure_model_files(&cache).unwrap();
        assert_eq!(paths, ModelPaths::in_dir(&cache.model_dir()));
        assert!(paths.weights.ends_with(WEIGHTS_FILE));
    }

    #[test]
    fn test_empty_repo_rejected() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), " ");
        assert!(matches!(
            ensure_model_files(&cache),
            Err(EmbeddingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_store_file_leaves_no_partial() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("fetched.json");
        std::fs::write(&source, b"{\"hidden_size\": 384}").unwrap();
        let dir = temp.path().join("org--model");
        std::fs::create_dir_all(&dir).unwrap();

        store_file(&source, &dir, CONFIG_FILE).unwrap();
        assert!(dir.join(CONFIG_FILE).is_file());
        assert!(!dir.join("config.json.part").exists());
    }
}
