//! File-event adapter.
//!
//! Accepts created / modified / deleted notifications from any watcher
//! (one JSON object per event) and applies them to the store. Deletions
//! are logged only; stored records are never removed.
//!
//! ```json
//! {"kind":"modified","path":"/home/user/notes.txt","is_directory":false}
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use memory_embeddings::EmbeddingModel;
use memory_vector::{InsertOutcome, StoreHandle};

use crate::bootstrap::index_file;
use crate::error::IngestError;
use crate::options::IngestOptions;

/// Kind of filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    Created,
    Modified,
    Deleted,
}

/// One filesystem notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub path: PathBuf,
    #[serde(default)]
    pub is_directory: bool,
}

impl FileEvent {
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            is_directory: false,
        }
    }

    /// Parse one JSON event line.
    pub fn from_json(line: &str) -> Result<Self, IngestError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// What the adapter did with an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EventAction {
    Indexed { position: u64 },
    AlreadyIndexed { position: u64 },
    Ignored,
    DeleteLogged,
}

/// Applies file events to a store.
pub struct EventAdapter {
    handle: StoreHandle,
    embedder: Arc<dyn EmbeddingModel>,
    options: IngestOptions,
}

impl EventAdapter {
    pub fn new(
        handle: StoreHandle,
        embedder: Arc<dyn EmbeddingModel>,
        options: IngestOptions,
    ) -> Self {
        Self {
            handle,
            embedder,
            options,
        }
    }

    pub fn handle(&self, event: &FileEvent) -> Result<EventAction, IngestError> {
        if event.is_directory || self.options.is_ignored(&event.path) {
            debug!(path = ?event.path, "Ignoring event");
            return Ok(EventAction::Ignored);
        }

        match event.kind {
            FileEventKind::Deleted => {
                info!(path = ?event.path, "Detected deletion");
                Ok(EventAction::DeleteLogged)
            }
            FileEventKind::Created | FileEventKind::Modified => {
                let outcome = index_file(
                    &self.handle,
                    self.embedder.as_ref(),
                    &event.path,
                    self.options.snippet_chars,
                )?;
                Ok(match outcome {
                    InsertOutcome::Inserted { position } => {
                        info!(path = ?event.path, position, "Indexed file");
                        EventAction::Indexed { position }
                    }
                    InsertOutcome::Skipped { position } => EventAction::AlreadyIndexed { position },
                })
            }
        }
    }

    /// Parse and apply one JSON line; errors are logged and returned.
    pub fn handle_line(&self, line: &str) -> Result<EventAction, IngestError> {
        let result = FileEvent::from_json(line).and_then(|event| self.handle(&event));
        if let Err(e) = &result {
            warn!(error = %e, "Event not applied");
        }
        result
    }
}
