//! Vector index trait and types.
//!
//! Defines the interface for append-only similarity search.

use crate::error::VectorError;

/// Result of a vector search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Position of the vector (insertion order, zero-based)
    pub position: u64,
    /// Inner-product similarity (higher = more similar)
    pub score: f32,
}

impl SearchResult {
    pub fn new(position: u64, score: f32) -> Self {
        Self { position, score }
    }
}

/// Index statistics
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    /// Number of vectors in the index
    pub vector_count: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// Bytes held by vector data in memory
    pub memory_bytes: usize,
}

/// Trait for append-only vector indexes.
///
/// Positions are dense and assigned in append order; nothing is ever
/// removed or overwritten.
pub trait VectorIndex: Send + Sync {
    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a vector, returning its position (the prior count).
    fn append(&mut self, vector: &[f32]) -> Result<u64, VectorError>;

    /// Top `k` positions by descending score, ties by ascending position.
    /// Empty index or `k == 0` yields an empty list.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorError>;

    /// Stored vector at a position.
    fn vector(&self, position: u64) -> Option<&[f32]>;

    /// Get index statistics
    fn stats(&self) -> IndexStats;
}
