//! Ingestion options shared by every adapter.

use std::path::Path;

use memory_types::IngestSettings;
use memory_vector::STORE_FILES;

/// Snippet length and ignore rules.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Characters read from the head of a file
    pub snippet_chars: usize,
    /// A file whose name contains any of these is never indexed
    pub ignored_names: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from_settings(&IngestSettings::default())
    }
}

impl IngestOptions {
    pub fn from_settings(settings: &IngestSettings) -> Self {
        Self {
            snippet_chars: settings.snippet_chars,
            ignored_names: settings.ignored_names.clone(),
        }
    }

    /// True for ignored names and for the store's own files (including
    /// their temporary siblings written during a checkpoint).
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let store_file = STORE_FILES.iter().any(|own| {
            name.strip_prefix(own)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
        });
        store_file
            || self
                .ignored_names
                .iter()
                .any(|ignored| !ignored.is_empty() && name.contains(ignored.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignores() {
        let options = IngestOptions::default();
        assert!(options.is_ignored(Path::new("/proj/.env")));
        assert!(options.is_ignored(Path::new("/proj/.env.local")));
        assert!(options.is_ignored(Path::new("/proj/venv")));
        assert!(options.is_ignored(Path::new("/store/journal.wal")));
        assert!(options.is_ignored(Path::new("/store/vectors.bin.tmp")));
        assert!(!options.is_ignored(Path::new("/proj/notes.txt")));
        assert!(!options.is_ignored(Path::new("/proj/BLOCKS.md")));
    }

    #[test]
    fn test_custom_ignores() {
        let options = IngestOptions {
            snippet_chars: 10,
            ignored_names: vec!["secret".to_string(), String::new()],
        };
        assert!(options.is_ignored(Path::new("/a/my-secret.txt")));
        assert!(!options.is_ignored(Path::new("/a/public.txt")));
        assert!(!options.is_ignored(Path::new("/")));
    }
}
