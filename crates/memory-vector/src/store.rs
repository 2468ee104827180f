//! Memory store: vector index + metadata table + journal as one unit.
//!
//! Invariants held between every public call:
//! - vector count == metadata record count, except for positions whose
//!   metadata line was lost and could not be recovered from the journal;
//!   those stay as holes and never appear in search results
//! - no two records share a canonical path
//! - a position's vector and record never change once written
//!
//! Insert order is canonicalize -> dedup -> embed -> journal (fsync) ->
//! in-memory append. Nothing touches disk or memory until the embedding
//! succeeded, and an insert is durable once its journal frame is synced.
//! Snapshots are rewritten every `snapshot_interval` journal entries.

use std::fs::{File, OpenOptions};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use memory_embeddings::{Embedding, EmbeddingError, EmbeddingModel};

use crate::error::VectorError;
use crate::flat::FlatIndex;
use crate::format::{read_vector_snapshot, write_vector_snapshot};
use crate::index::VectorIndex;
use crate::journal::{Journal, JournalEntry};
use crate::metadata::{MetadataRecord, MetadataTable};

pub const VECTOR_SNAPSHOT_FILE: &str = "vectors.bin";
pub const METADATA_SNAPSHOT_FILE: &str = "metadata.txt";
pub const JOURNAL_FILE: &str = "journal.wal";
pub const LOCK_FILE: &str = "LOCK";

/// Every file the store owns inside its directory.
pub const STORE_FILES: &[&str] = &[
    VECTOR_SNAPSHOT_FILE,
    METADATA_SNAPSHOT_FILE,
    JOURNAL_FILE,
    LOCK_FILE,
];

/// Warning returned by a search over an empty store.
pub const NO_DOCUMENTS_WARNING: &str = "No documents indexed in long-term memory.";

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding snapshots, journal and lock file
    pub dir: PathBuf,
    /// Journal entries before automatic compaction (0 = never)
    pub snapshot_interval: usize,
    /// Maximum stored summary length in bytes
    pub max_summary_len: usize,
}

impl StoreConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            snapshot_interval: 64,
            max_summary_len: 1024,
        }
    }

    pub fn with_snapshot_interval(mut self, entries: usize) -> Self {
        self.snapshot_interval = entries;
        self
    }

    pub fn with_max_summary_len(mut self, bytes: usize) -> Self {
        self.max_summary_len = bytes;
        self
    }

    pub fn vector_snapshot_path(&self) -> PathBuf {
        self.dir.join(VECTOR_SNAPSHOT_FILE)
    }

    pub fn metadata_snapshot_path(&self) -> PathBuf {
        self.dir.join(METADATA_SNAPSHOT_FILE)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }
}

/// Result of an insert call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InsertOutcome {
    /// New vector and record stored at `position`
    Inserted { position: u64 },
    /// Path already indexed at `position`; nothing changed
    Skipped { position: u64 },
}

impl InsertOutcome {
    pub fn position(&self) -> u64 {
        match self {
            InsertOutcome::Inserted { position } | InsertOutcome::Skipped { position } => {
                *position
            }
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }
}

/// One ranked search result joined with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// 1-based rank
    pub rank: usize,
    pub path: String,
    pub summary: String,
    pub score: f32,
}

/// Search result: ranked hits, or the empty-store sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Hits(Vec<SearchHit>),
    NoDocuments { warning: String },
}

impl SearchResponse {
    pub fn no_documents() -> Self {
        SearchResponse::NoDocuments {
            warning: NO_DOCUMENTS_WARNING.to_string(),
        }
    }

    /// Hits, or an empty slice for the sentinel.
    pub fn hits(&self) -> &[SearchHit] {
        match self {
            SearchResponse::Hits(hits) => hits,
            SearchResponse::NoDocuments { .. } => &[],
        }
    }

    pub fn is_no_documents(&self) -> bool {
        matches!(self, SearchResponse::NoDocuments { .. })
    }
}

/// Store statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub store_dir: PathBuf,
    pub dimension: usize,
    pub vectors: usize,
    pub records: usize,
    /// Positions with a vector but no readable metadata
    pub missing_records: usize,
    pub pending_journal_entries: usize,
    pub journal_bytes: u64,
    pub vector_snapshot_bytes: u64,
    pub metadata_snapshot_bytes: u64,
    pub last_checkpoint: Option<DateTime<Utc>>,
}

/// Persistent semantic memory store.
pub struct MemoryStore {
    config: StoreConfig,
    index: FlatIndex,
    metadata: MetadataTable,
    journal: Journal,
    last_checkpoint: Option<DateTime<Utc>>,
    // Held for the lifetime of the store; released when the file closes
    _lock: File,
}

impl MemoryStore {
    /// Open the store in `config.dir`, creating it if needed.
    ///
    /// Loads the snapshots, replays the journal and verifies alignment.
    /// Fails if another process holds the store, a snapshot is corrupt, or
    /// the stored dimension differs from `dimension`.
    pub fn open(config: StoreConfig, dimension: usize) -> Result<Self, VectorError> {
        std::fs::create_dir_all(&config.dir)?;
        let lock = acquire_lock(&config.lock_path())?;

        let mut index = match read_vector_snapshot(&config.vector_snapshot_path(), dimension)? {
            Some(index) => index,
            None => FlatIndex::new(dimension)?,
        };
        let (mut metadata, report) = MetadataTable::load(&config.metadata_snapshot_path())?;
        if report.skipped > 0 {
            warn!(skipped = report.skipped, "Metadata snapshot had unreadable lines");
        }

        // Lines lost from the tail become holes the journal may still fill
        metadata.extend_to(index.len() as u64);

        let (journal, entries) = Journal::open(config.journal_path())?;
        replay(&config, &mut index, &mut metadata, entries)?;

        let vectors = index.len() as u64;
        if metadata.next_position() > vectors {
            return Err(VectorError::Misaligned {
                vectors: index.len(),
                records: usize::try_from(metadata.next_position()).unwrap_or(usize::MAX),
            });
        }
        metadata.extend_to(vectors);
        if metadata.missing() > 0 {
            let positions: Vec<u64> = metadata.missing_positions().take(16).collect();
            warn!(
                missing = metadata.missing(),
                ?positions,
                "Vectors without metadata are excluded from search"
            );
        }

        let last_checkpoint = std::fs::metadata(config.metadata_snapshot_path())
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        info!(
            dir = ?config.dir,
            dimension,
            vectors = index.len(),
            pending = journal.entries(),
            "Opened memory store"
        );

        Ok(Self {
            config,
            index,
            metadata,
            journal,
            last_checkpoint,
            _lock: lock,
        })
    }

    /// Insert a document, embedding `"Path: <path>. Content Summary: <summary>"`.
    pub fn insert<E>(
        &mut self,
        path: impl AsRef<Path>,
        summary: &str,
        embedder: &E,
    ) -> Result<InsertOutcome, VectorError>
    where
        E: EmbeddingModel + ?Sized,
    {
        self.insert_with(path, summary, |canonical, summary| {
            embedder.embed(&document_text(canonical, summary))
        })
    }

    /// Insert a document using a caller-supplied embedding function.
    ///
    /// `embed` receives the canonical path and the (possibly truncated)
    /// summary. It is not called when the path is already indexed.
    pub fn insert_with<F>(
        &mut self,
        path: impl AsRef<Path>,
        summary: &str,
        embed: F,
    ) -> Result<InsertOutcome, VectorError>
    where
        F: FnOnce(&Path, &str) -> Result<Embedding, EmbeddingError>,
    {
        let canonical = canonicalize_path(path.as_ref())?;
        let key = path_key(&canonical)?;

        if let Some(position) = self.metadata.find_by_path(&key) {
            debug!(path = %key, position, "Already indexed, skipping");
            return Ok(InsertOutcome::Skipped { position });
        }

        let summary = truncate_at_char_boundary(summary, self.config.max_summary_len);
        let embedding = embed(&canonical, summary)?;
        if embedding.dimension() != self.index.dimension() {
            return Err(VectorError::DimensionMismatch {
                expected: self.index.dimension(),
                actual: embedding.dimension(),
            });
        }

        let position = self.index.len() as u64;
        let entry = JournalEntry {
            position,
            vector: embedding.into_values(),
            path: key,
            summary: summary.to_string(),
        };
        self.journal.append(&entry)?;
        self.apply(entry)?;

        info!(position, "Indexed document");
        self.maybe_checkpoint();
        Ok(InsertOutcome::Inserted { position })
    }

    /// Embed `query` and rank every stored document against it.
    pub fn search<E>(
        &self,
        query: &str,
        k: usize,
        embedder: &E,
    ) -> Result<SearchResponse, VectorError>
    where
        E: EmbeddingModel + ?Sized,
    {
        self.search_with(query, k, |query| embedder.embed(query))
    }

    /// Search using a caller-supplied embedding function.
    ///
    /// An empty store returns the no-documents sentinel without embedding.
    pub fn search_with<F>(
        &self,
        query: &str,
        k: usize,
        embed: F,
    ) -> Result<SearchResponse, VectorError>
    where
        F: FnOnce(&str) -> Result<Embedding, EmbeddingError>,
    {
        if self.metadata.is_empty() {
            debug!("Search on empty store");
            return Ok(SearchResponse::no_documents());
        }
        let embedding = embed(query)?;
        debug!(k, "Searching memory store");
        self.search_vector(&embedding.values, k)
            .map(SearchResponse::Hits)
    }

    /// Rank stored vectors against a query vector and join metadata.
    ///
    /// Positions without metadata are dropped from the join; enough extra
    /// candidates are ranked that they do not shorten the result.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, VectorError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let results = self
            .index
            .search(query, k.saturating_add(self.metadata.missing()))?;
        Ok(results
            .into_iter()
            .filter_map(|result| {
                self.metadata
                    .get(result.position)
                    .map(|record| (record, result.score))
            })
            .take(k)
            .enumerate()
            .map(|(rank, (record, score))| SearchHit {
                rank: rank + 1,
                path: record.path.clone(),
                summary: record.summary.clone(),
                score,
            })
            .collect())
    }

    /// Rewrite both snapshots from memory and empty the journal.
    pub fn checkpoint(&mut self) -> Result<(), VectorError> {
        write_vector_snapshot(&self.config.vector_snapshot_path(), &self.index)?;
        self.metadata.save(&self.config.metadata_snapshot_path())?;
        self.journal.truncate()?;
        self.last_checkpoint = Some(Utc::now());
        info!(vectors = self.index.len(), "Checkpointed memory store");
        Ok(())
    }

    pub fn get(&self, position: u64) -> Option<&MetadataRecord> {
        self.metadata.get(position)
    }

    pub fn vector(&self, position: u64) -> Option<&[f32]> {
        self.index.vector(position)
    }

    /// Position of an indexed path (canonicalized first).
    pub fn find_by_path(&self, path: impl AsRef<Path>) -> Result<Option<u64>, VectorError> {
        let key = path_key(&canonicalize_path(path.as_ref())?)?;
        Ok(self.metadata.find_by_path(&key))
    }

    pub fn contains_path(&self, path: impl AsRef<Path>) -> bool {
        matches!(self.find_by_path(path), Ok(Some(_)))
    }

    pub fn records(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.metadata.iter()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn vector_count(&self) -> usize {
        self.index.len()
    }

    pub fn metadata_count(&self) -> usize {
        self.metadata.len()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    pub fn stats(&self) -> StoreStats {
        let file_len = |path: PathBuf| std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        StoreStats {
            store_dir: self.config.dir.clone(),
            dimension: self.index.dimension(),
            vectors: self.index.len(),
            records: self.metadata.len(),
            missing_records: self.metadata.missing(),
            pending_journal_entries: self.journal.entries(),
            journal_bytes: self.journal.size_bytes(),
            vector_snapshot_bytes: file_len(self.config.vector_snapshot_path()),
            metadata_snapshot_bytes: file_len(self.config.metadata_snapshot_path()),
            last_checkpoint: self.last_checkpoint,
        }
    }

    /// Append a journaled entry to both in-memory structures.
    fn apply(&mut self, entry: JournalEntry) -> Result<(), VectorError> {
        let position = self.index.append(&entry.vector)?;
        self.metadata.put(position, entry.path, entry.summary)
    }

    fn maybe_checkpoint(&mut self) {
        let interval = self.config.snapshot_interval;
        if interval == 0 || self.journal.entries() < interval {
            return;
        }
        // The insert is already durable in the journal
        if let Err(e) = self.checkpoint() {
            warn!(error = %e, "Automatic checkpoint failed; journal retained");
        }
    }
}

/// Text embedded for a document.
pub fn document_text(path: &Path, summary: &str) -> String {
    format!("Path: {}. Content Summary: {}", path.display(), summary)
}

/// Apply journal frames on top of the snapshots.
///
/// A frame whose position is already present in one structure is skipped
/// for that structure; this covers a crash after a snapshot rename but
/// before the journal was truncated. A frame for a metadata hole fills it.
fn replay(
    config: &StoreConfig,
    index: &mut FlatIndex,
    metadata: &mut MetadataTable,
    entries: Vec<JournalEntry>,
) -> Result<(), VectorError> {
    let journal_err = |reason: String| VectorError::Journal {
        path: config.journal_path(),
        reason,
    };

    for entry in entries {
        let position = entry.position;

        if entry.vector.len() != index.dimension() {
            return Err(VectorError::DimensionMismatch {
                expected: index.dimension(),
                actual: entry.vector.len(),
            });
        }

        let vectors = index.len() as u64;
        if position == vectors {
            index.append(&entry.vector)?;
        } else if position > vectors {
            return Err(journal_err(format!(
                "frame for position {position} but only {vectors} vectors"
            )));
        }

        let records = metadata.next_position();
        if position == records {
            metadata.put(position, entry.path, entry.summary)?;
        } else if position > records {
            return Err(journal_err(format!(
                "frame for position {position} but only {records} records"
            )));
        } else {
            match metadata.get(position) {
                None => {
                    debug!(position, "Recovered metadata from journal");
                    metadata.restore(position, entry.path, entry.summary)?;
                }
                Some(record) if record.path != entry.path => {
                    return Err(journal_err(format!(
                        "frame for position {position} conflicts with stored record"
                    )));
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

fn acquire_lock(path: &Path) -> Result<File, VectorError> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    if file.try_lock_exclusive().is_err() {
        let dir = path.parent().unwrap_or(path).to_path_buf();
        return Err(VectorError::Locked(dir));
    }
    Ok(file)
}

/// Absolute path with symlinks resolved when the path exists, otherwise
/// with `.` and `..` removed lexically.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, VectorError> {
    if path.as_os_str().is_empty() {
        return Err(VectorError::InvalidPath("empty path".to_string()));
    }
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return Ok(canonical);
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

fn path_key(path: &Path) -> Result<String, VectorError> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| VectorError::InvalidPath(format!("non UTF-8 path {:?}", path)))
}

/// Truncate a string to at most `max_bytes` bytes on a char boundary.
pub fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_embeddings::HashingEmbedder;
    use tempfile::TempDir;

    fn open(dir: &Path, dim: usize) -> MemoryStore {
        MemoryStore::open(StoreConfig::new(dir).with_snapshot_interval(0), dim).unwrap()
    }

    fn fixed(values: Vec<f32>) -> impl FnOnce(&Path, &str) -> Result<Embedding, EmbeddingError> {
        move |_, _| Ok(Embedding::from_values(values))
    }

    #[test]
    fn test_open_empty() {
        let temp = TempDir::new().unwrap();
        let store = open(temp.path(), 4);
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 4);
        assert_eq!(store.stats().pending_journal_entries, 0);
    }

    #[test]
    fn test_insert_assigns_positions_in_order() {
        let temp = TempDir::new().unwrap();
        let mut store = open(temp.path(), 2);
        for i in 0..4u64 {
            let outcome = store
                .insert_with(format!("/docs/{}.txt", i), "s", fixed(vec![1.0, 0.0]))
                .unwrap();
            assert_eq!(outcome, InsertOutcome::Inserted { position: i });
            assert_eq!(store.vector_count(), store.metadata_count());
        }
        assert_eq!(store.get(2).unwrap().path, "/docs/2.txt");
    }

    #[test]
    fn test_dedup_skips_without_embedding() {
        let temp = TempDir::new().unwrap();
        let mut store = open(temp.path(), 2);
        store
            .insert_with("/docs/a.txt", "first", fixed(vec![1.0, 0.0]))
            .unwrap();

        let outcome = store
            .insert_with("/docs/./a.txt", "second", |_, _| {
                panic!("embedding must not run for an indexed path")
            })
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Skipped { position: 0 });
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().summary, "first");
    }

    #[test]
    fn test_embedding_failure_leaves_store_untouched() {
        let temp = TempDir::new().unwrap();
        let mut store = open(temp.path(), 2);
        let result = store.insert_with("/docs/a.txt", "x", |_, _| {
            Err(EmbeddingError::Unavailable("offline".to_string()))
        });
        assert!(matches!(result, Err(VectorError::Embedding(_))));
        assert!(store.is_empty());
        assert_eq!(store.stats().journal_bytes, 0);
    }

    #[test]
    fn test_wrong_dimension_rejected_before_write() {
        let temp = TempDir::new().unwrap();
        let mut store = open(temp.path(), 3);
        let result = store.insert_with("/docs/a.txt", "x", fixed(vec![1.0, 0.0]));
        assert!(matches!(
            result,
            Err(VectorError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(store.is_empty());
        assert!(!store.contains_path("/docs/a.txt"));
    }

    #[test]
    fn test_search_empty_returns_sentinel() {
        let temp = TempDir::new().unwrap();
        let store = open(temp.path(), 2);
        let response = store
            .search_with("anything", 3, |_| panic!("no embedding for empty store"))
            .unwrap();
        assert!(response.is_no_documents());
        assert!(response.hits().is_empty());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["warning"], NO_DOCUMENTS_WARNING);
    }

    #[test]
    fn test_search_ranks_and_joins_metadata() {
        let temp = TempDir::new().unwrap();
        let mut store = open(temp.path(), 2);
        store.insert_with("/v0", "zero", fixed(vec![1.0, 0.0])).unwrap();
        store.insert_with("/v1", "one", fixed(vec![0.0, 1.0])).unwrap();
        store.insert_with("/v2", "two", fixed(vec![0.9, 0.1])).unwrap();

        let response = store
            .search_with("q", 2, |_| Ok(Embedding::from_values(vec![1.0, 0.0])))
            .unwrap();
        let hits = response.hits();
        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].rank, hits[0].path.as_str()), (1, "/v0"));
        assert_eq!((hits[1].rank, hits[1].path.as_str()), (2, "/v2"));
        assert_eq!(hits[1].summary, "two");
    }

    #[test]
    fn test_vectors_without_metadata_search_as_empty() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = open(temp.path(), 2);
            store.insert_with("/only", "one", fixed(vec![1.0, 0.0])).unwrap();
            store.checkpoint().unwrap();
        }
        std::fs::write(temp.path().join(METADATA_SNAPSHOT_FILE), "").unwrap();

        let store = open(temp.path(), 2);
        assert_eq!(store.vector_count(), 1);
        assert_eq!(store.stats().missing_records, 1);
        let response = store
            .search_with("q", 3, |_| Ok(Embedding::from_values(vec![1.0, 0.0])))
            .unwrap();
        assert!(response.is_no_documents());
    }

    #[test]
    fn test_search_response_json_shape() {
        let response = SearchResponse::Hits(vec![SearchHit {
            rank: 1,
            path: "/a".to_string(),
            summary: "s".to_string(),
            score: 0.5,
        }]);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["rank"], 1);
        assert_eq!(json[0]["path"], "/a");
    }

    #[test]
    fn test_insert_outcome_json_shape() {
        let json = serde_json::to_value(InsertOutcome::Skipped { position: 4 }).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["position"], 4);
    }

    #[test]
    fn test_journal_replay_without_checkpoint() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = open(temp.path(), 2);
            store.insert_with("/a", "alpha", fixed(vec![1.0, 0.0])).unwrap();
            store.insert_with("/b", "beta", fixed(vec![0.0, 1.0])).unwrap();
        }
        assert!(!temp.path().join(VECTOR_SNAPSHOT_FILE).exists());

        let store = open(temp.path(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().summary, "beta");
        assert_eq!(store.vector(1), Some(&[0.0, 1.0][..]));
        assert_eq!(store.stats().pending_journal_entries, 2);
    }

    #[test]
    fn test_checkpoint_then_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = open(temp.path(), 2);
            store.insert_with("/a", "alpha", fixed(vec![1.0, 0.0])).unwrap();
            store.checkpoint().unwrap();
            store.insert_with("/b", "beta", fixed(vec![0.0, 1.0])).unwrap();
            assert_eq!(store.stats().pending_journal_entries, 1);
        }
        let store = open(temp.path(), 2);
        assert_eq!(store.len(), 2);
        assert!(store.stats().last_checkpoint.is_some());
        assert_eq!(store.find_by_path("/b").unwrap(), Some(1));
    }

    #[test]
    fn test_automatic_checkpoint_interval() {
        let temp = TempDir::new().unwrap();
        let config = StoreConfig::new(temp.path()).with_snapshot_interval(2);
        let mut store = MemoryStore::open(config, 2).unwrap();
        store.insert_with("/a", "a", fixed(vec![1.0, 0.0])).unwrap();
        assert_eq!(store.stats().pending_journal_entries, 1);
        store.insert_with("/b", "b", fixed(vec![0.0, 1.0])).unwrap();
        assert_eq!(store.stats().pending_journal_entries, 0);
        assert!(store.stats().vector_snapshot_bytes > 0);
    }

    #[test]
    fn test_second_open_is_locked() {
        let temp = TempDir::new().unwrap();
        let _store = open(temp.path(), 2);
        let second = MemoryStore::open(StoreConfig::new(temp.path()), 2);
        assert!(matches!(second, Err(VectorError::Locked(_))));
    }

    #[test]
    fn test_reopen_with_other_dimension_fails() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = open(temp.path(), 2);
            store.insert_with("/a", "a", fixed(vec![1.0, 0.0])).unwrap();
            store.checkpoint().unwrap();
        }
        let result = MemoryStore::open(StoreConfig::new(temp.path()), 3);
        assert!(matches!(result, Err(VectorError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_summary_truncated_on_char_boundary() {
        let temp = TempDir::new().unwrap();
        let config = StoreConfig::new(temp.path())
            .with_snapshot_interval(0)
            .with_max_summary_len(5);
        let mut store = MemoryStore::open(config, 2).unwrap();
        store
            .insert_with("/a", "abcdé-tail", |_, summary| {
                assert_eq!(summary, "abcd");
                Ok(Embedding::from_values(vec![1.0, 0.0]))
            })
            .unwrap();
        assert_eq!(store.get(0).unwrap().summary, "abcd");
    }

    #[test]
    fn test_insert_with_model_embeds_document_text() {
        let temp = TempDir::new().unwrap();
        let embedder = HashingEmbedder::new(32).unwrap();
        let mut store = open(temp.path(), 32);
        store.insert("/notes/latency.txt", "vector search latency report", &embedder).unwrap();

        let expected = embedder
            .embed(&document_text(Path::new("/notes/latency.txt"), "vector search latency report"))
            .unwrap();
        assert_eq!(store.vector(0), Some(expected.values.as_slice()));

        let response = store.search("latency", 3, &embedder).unwrap();
        assert_eq!(response.hits()[0].path, "/notes/latency.txt");
    }

    #[test]
    fn test_canonicalize_nonexistent_path() {
        let canonical = canonicalize_path(Path::new("/no/such/dir/../file.txt")).unwrap();
        assert_eq!(canonical, PathBuf::from("/no/such/file.txt"));
        assert!(canonicalize_path(Path::new("")).is_err());
    }

    #[test]
    fn test_canonicalize_existing_relative_path() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("real.txt");
        std::fs::write(&file, "x").unwrap();
        let dotted = temp.path().join(".").join("real.txt");
        assert_eq!(
            canonicalize_path(&dotted).unwrap(),
            std::fs::canonicalize(&file).unwrap()
        );
    }

    #[test]
    fn test_truncate_at_char_boundary() {
        assert_eq!(truncate_at_char_boundary("hello", 10), "hello");
        assert_eq!(truncate_at_char_boundary("hello", 3), "hel");
        assert_eq!(truncate_at_char_boundary("héllo", 2), "h");
    }
}
