//! End-to-end test infrastructure for the semantic memory store.
//!
//! Provides a shared TestHarness and helpers for tests covering
//! ingest -> persist -> reopen -> search across crates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use memory_embeddings::{Embedding, EmbeddingModel, HashingEmbedder};
use memory_vector::{MemoryStore, StoreConfig, StoreHandle};

/// Dimension used by the harness embedder.
pub const TEST_DIMENSION: usize = 64;

/// Shared test harness for E2E tests.
///
/// Owns a temp directory with a `store/` directory for the memory store
/// and a `docs/` directory for source files.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Store directory
    pub store_dir: PathBuf,
    /// Directory for source documents
    pub docs_dir: PathBuf,
    /// Deterministic embedder
    pub embedder: Arc<HashingEmbedder>,
}

impl TestHarness {
    /// Create a new test harness with temp directory and embedder.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let store_dir = temp_dir.path().join("store");
        let docs_dir = temp_dir.path().join("docs");
        std::fs::create_dir_all(&docs_dir).expect("Failed to create docs dir");

        Self {
            _temp_dir: temp_dir,
            store_dir,
            docs_dir,
            embedder: Arc::new(
                HashingEmbedder::new(TEST_DIMENSION).expect("Failed to create embedder"),
            ),
        }
    }

    /// Store configuration; `snapshot_interval` 0 keeps everything in the journal.
    pub fn config(&self, snapshot_interval: usize) -> StoreConfig {
        StoreConfig::new(&self.store_dir).with_snapshot_interval(snapshot_interval)
    }

    /// Open the store at the harness dimension.
    pub fn open_store(&self, snapshot_interval: usize) -> MemoryStore {
        MemoryStore::open(self.config(snapshot_interval), TEST_DIMENSION)
            .expect("Failed to open store")
    }

    /// Open a shared handle at the harness dimension.
    pub fn open_handle(&self, snapshot_interval: usize) -> StoreHandle {
        StoreHandle::open(self.config(snapshot_interval), TEST_DIMENSION)
            .expect("Failed to open store handle")
    }

    /// Write a document under `docs/` and return its path.
    pub fn write_doc(&self, name: &str, content: &str) -> PathBuf {
        let path = self.docs_dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create doc parent");
        }
        std::fs::write(&path, content).expect("Failed to write doc");
        path
    }

    /// Path of a file inside the store directory.
    pub fn store_file(&self, name: &str) -> PathBuf {
        self.store_dir.join(name)
    }

    pub fn embed(&self, text: &str) -> Embedding {
        self.embedder.embed(text).expect("Failed to embed")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Seeded random vectors for deterministic bulk tests.
pub fn random_vectors(count: usize, dimension: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dimension).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect())
        .collect()
}

/// Insert raw vectors under synthetic paths `/bulk/<i>.txt`.
pub fn insert_vectors(store: &mut MemoryStore, vectors: &[Vec<f32>]) {
    for (i, vector) in vectors.iter().enumerate() {
        let vector = vector.clone();
        store
            .insert_with(format!("/bulk/{}.txt", i), &format!("doc {}", i), move |_, _| {
                Ok(Embedding::from_values(vector))
            })
            .expect("Failed to insert vector");
    }
}

/// Documents with disjoint vocabularies, indexed under fixed virtual paths.
pub const CORPUS: &[(&str, &str)] = &[
    (
        "/memory/meeting_notes_2025.txt",
        "Quarterly budget meeting with finance team, approved hiring plan",
    ),
    (
        "/memory/ops_log.txt",
        "Server deployment log: kubernetes rollout finished, latency alerts cleared",
    ),
    (
        "/memory/recipes.txt",
        "Grandmother pasta recipe with tomato sauce and basil",
    ),
];

/// Insert [`CORPUS`] through the embedder.
pub fn insert_corpus<E: EmbeddingModel + ?Sized>(handle: &StoreHandle, embedder: &E) {
    for (path, summary) in CORPUS {
        handle
            .insert(Path::new(path), summary, embedder)
            .expect("Failed to insert corpus document");
    }
}
