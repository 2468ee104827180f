//! Bootstrap scan: index known files that are not yet in the store.
//!
//! Each configured entry may be a file or a directory; directories are
//! walked recursively. One bad file never aborts the batch: failures are
//! logged and counted.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use memory_embeddings::EmbeddingModel;
use memory_vector::{InsertOutcome, StoreHandle};

use crate::error::IngestError;
use crate::options::IngestOptions;
use crate::snippet::summarize_file;

/// Counters for one ingestion batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Files considered
    pub processed: usize,
    /// Newly stored
    pub inserted: usize,
    /// Already indexed, missing, or ignored
    pub skipped: usize,
    /// Failed to read or store
    pub errors: usize,
}

impl IngestStats {
    fn record(&mut self, path: &Path, result: Result<InsertOutcome, IngestError>) {
        self.processed += 1;
        match result {
            Ok(InsertOutcome::Inserted { position }) => {
                self.inserted += 1;
                info!(path = ?path, position, "Pre-indexed file");
            }
            Ok(InsertOutcome::Skipped { .. }) => {
                self.skipped += 1;
                debug!(path = ?path, "Already indexed");
            }
            Err(IngestError::Binary(_)) => {
                self.skipped += 1;
                warn!(path = ?path, "Skipped binary file");
            }
            Err(e) => {
                self.errors += 1;
                error!(path = ?path, error = %e, "Failed to index file");
            }
        }
    }
}

/// Index one file, summarizing it from its first `snippet_chars` chars.
///
/// An already indexed path is reported as skipped without reading it.
pub fn index_file<E>(
    handle: &StoreHandle,
    embedder: &E,
    path: &Path,
    snippet_chars: usize,
) -> Result<InsertOutcome, IngestError>
where
    E: EmbeddingModel + ?Sized,
{
    if let Some(position) = handle.with(|store| store.find_by_path(path))?? {
        return Ok(InsertOutcome::Skipped { position });
    }
    let summary = summarize_file(path, snippet_chars)?;
    Ok(handle.insert(path, &summary, embedder)?)
}

/// Index every listed file and every file under listed directories.
///
/// Entries that do not exist are counted as skipped.
pub fn pre_index<E>(
    handle: &StoreHandle,
    embedder: &E,
    paths: &[PathBuf],
    options: &IngestOptions,
) -> IngestStats
where
    E: EmbeddingModel + ?Sized,
{
    info!(entries = paths.len(), "Checking files for pre-indexing");
    let mut stats = IngestStats::default();

    for root in paths {
        if !root.exists() {
            debug!(path = ?root, "Bootstrap entry does not exist");
            stats.processed += 1;
            stats.skipped += 1;
            continue;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !options.is_ignored(entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    stats.errors += 1;
                    warn!(root = ?root, error = %e, "Failed to walk bootstrap entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if options.is_ignored(entry.path()) {
                stats.processed += 1;
                stats.skipped += 1;
                continue;
            }
            let result = index_file(handle, embedder, entry.path(), options.snippet_chars);
            stats.record(entry.path(), result);
        }
    }

    info!(
        processed = stats.processed,
        inserted = stats.inserted,
        skipped = stats.skipped,
        errors = stats.errors,
        "Pre-indexing complete"
    );
    stats
}
