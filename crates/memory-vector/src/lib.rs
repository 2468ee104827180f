//! # memory-vector
//!
//! Persistent semantic memory store.
//!
//! Keeps an append-only set of embedding vectors alongside a positional
//! metadata table (position -> path, summary) and persists both so they
//! stay aligned across restarts and crashes.
//!
//! ## Features
//! - Exact inner-product top-k search over a flat index
//! - Path de-duplication on canonical absolute paths
//! - Write-ahead journal with per-frame CRC; torn tails are discarded
//! - Atomic snapshot rewrites (temp file + fsync + rename)
//! - Advisory lock file so only one process opens a store directory
//!
//! ## On-disk layout
//! - `vectors.bin`: vector snapshot (`SMVX` header, f32 body, CRC32)
//! - `metadata.txt`: `#metadata v1` header, then one escaped
//!   `position|path|summary` line per record
//! - `journal.wal`: inserts since the last checkpoint
//! - `LOCK`: held while a store is open

pub mod error;
pub mod flat;
pub mod format;
pub mod handle;
pub mod index;
pub mod journal;
pub mod metadata;
pub mod store;

pub use error::VectorError;
pub use flat::FlatIndex;
pub use format::{read_vector_snapshot, write_vector_snapshot, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
pub use handle::StoreHandle;
pub use index::{IndexStats, SearchResult, VectorIndex};
pub use journal::{Journal, JournalEntry};
pub use metadata::{LoadReport, MetadataRecord, MetadataTable, FORMAT_HEADER};
pub use store::{
    canonicalize_path, document_text, truncate_at_char_boundary, InsertOutcome, MemoryStore,
    SearchHit, SearchResponse, StoreConfig, StoreStats, JOURNAL_FILE, LOCK_FILE,
    METADATA_SNAPSHOT_FILE, NO_DOCUMENTS_WARNING, STORE_FILES, VECTOR_SNAPSHOT_FILE,
};
