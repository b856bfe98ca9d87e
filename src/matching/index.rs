//! Flat vector index with squared-Euclidean k-NN search, plus the ordered
//! ID map translating internal positions to recipe identifiers.
//!
//! Vectors are appended at build time in the exact order their recipe ids
//! are appended to the ID map; that positional correspondence is the
//! load-bearing invariant of the matching subsystem.

use serde::{Deserialize, Serialize};

/// Fixed-dimension vector store. Search is exact and linear; the corpus is
/// a few thousand recipes, rebuilt offline.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimensions: usize,
    data: Vec<f32>,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: vec![],
        }
    }

    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self {
            dimensions,
            data: Vec::with_capacity(dimensions * capacity),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored vectors.
    pub fn count(&self) -> usize {
        if self.dimensions == 0 {
            return 0;
        }
        self.data.len() / self.dimensions
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector at the next internal position.
    pub fn push(&mut self, embedding: &[f32]) -> Result<(), IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }

        self.data.extend_from_slice(embedding);
        Ok(())
    }

    /// The vector at an internal position.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.count() {
            return None;
        }
        let start = position * self.dimensions;
        Some(&self.data[start..start + self.dimensions])
    }

    /// k-nearest neighbors of `query` by squared Euclidean distance.
    ///
    /// Returns at most `min(k, count)` `(internal_position, distance)`
    /// pairs ordered by ascending distance; ties keep position order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let mut results: Vec<(usize, f32)> = (0..self.count())
            .map(|position| {
                let start = position * self.dimensions;
                let stored = &self.data[start..start + self.dimensions];
                let distance = stored
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>();
                (position, distance)
            })
            .collect();

        // Stable sort keeps insertion order on equal distances.
        results.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k.min(self.count()));

        Ok(results)
    }
}

/// Ordered sequence of recipe identifiers; position `i` names the owner of
/// the vector at internal position `i`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdMap(Vec<String>);

impl IdMap {
    pub fn new() -> Self {
        Self(vec![])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, id: String) {
        self.0.push(id);
    }

    /// Bounds-checked lookup; `None` signals a corrupt internal position.
    pub fn get(&self, position: usize) -> Option<&str> {
        self.0.get(position).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
