//! Exact inner-product index over a contiguous vector buffer.
//!
//! Search scores every stored vector; at the target scale (thousands to low
//! millions of vectors) a linear scan is simple and gives exact results.
//! Inner product is not scale-invariant: callers normalize vectors if they
//! want cosine ranking.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::VectorError;
use crate::index::{IndexStats, SearchResult, VectorIndex};

/// Flat (brute-force) vector index.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index with a fixed dimension.
    pub fn new(dimension: usize) -> Result<Self, VectorError> {
        if dimension == 0 {
            return Err(VectorError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Rebuild from row-major vector data (as read from a snapshot).
    pub fn from_parts(dimension: usize, data: Vec<f32>) -> Result<Self, VectorError> {
        let mut index = Self::new(dimension)?;
        if data.len() % dimension != 0 {
            return Err(VectorError::DimensionMismatch {
                expected: dimension,
                actual: data.len() % dimension,
            });
        }
        index.data = data;
        Ok(index)
    }

    /// Row-major view of every stored component, in append order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Iterate stored vectors in position order.
    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension)
    }

    fn check_dimension(&self, len: usize) -> Result<(), VectorError> {
        if len != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: len,
            });
        }
        Ok(())
    }
}

/// NaN scores sort below every real score; `-0.0` ranks equal to `0.0`.
fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else if score == 0.0 {
        0.0
    } else {
        score
    }
}

/// Descending score, then ascending position.
fn rank_order(a: &SearchResult, b: &SearchResult) -> Ordering {
    rank_key(b.score)
        .total_cmp(&rank_key(a.score))
        .then_with(|| a.position.cmp(&b.position))
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn append(&mut self, vector: &[f32]) -> Result<u64, VectorError> {
        self.check_dimension(vector.len())?;
        let position = self.len() as u64;
        self.data.extend_from_slice(vector);
        debug!(position, "Appended vector");
        Ok(position)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorError> {
        self.check_dimension(query.len())?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<SearchResult> = self
            .iter()
            .enumerate()
            .map(|(position, vector)| SearchResult::new(position as u64, inner_product(query, vector)))
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank_order);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank_order);

        debug!(k, found = scored.len(), "Search complete");
        Ok(scored)
    }

    fn vector(&self, position: u64) -> Option<&[f32]> {
        let start = usize::try_from(position).ok()?.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.data.get(start..end)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            vector_count: self.len(),
            dimension: self.dimension,
            memory_bytes: self.data.len() * std::mem::size_of::<f32>(),
        }
    }
}
