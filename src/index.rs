//! Flat nearest-neighbour index over embedding vectors.
//!
//! Exact search by squared Euclidean distance: every query scans every
//! stored vector. The store this indexes holds a few hundred utterances,
//! so no approximation is needed. The index is built once and never
//! mutated; a changed store means a new index.

use crate::{Embedding, PatisserieError, Result};

/// One search hit: position of the stored vector and its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

/// Read-only exact k-NN index.
#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    dimensions: usize,
    /// Row-major, `len * dimensions` values.
    data: Vec<f32>,
    len: usize,
}

impl SimilarityIndex {
    /// Build an index over `vectors`, in order.
    ///
    /// All vectors must share one dimensionality.
    pub fn build(vectors: &[Embedding]) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Ok(Self::default());
        };
        let dimensions = first.values.len();
        if dimensions == 0 {
            return Err(PatisserieError::InvalidInput(
                "cannot index zero-dimensional vectors".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(vectors.len() * dimensions);
        for (i, vector) in vectors.iter().enumerate() {
            if vector.values.len() != dimensions {
                return Err(PatisserieError::InvalidInput(format!(
                    "vector {i} has {} dimensions, index has {dimensions}",
                    vector.values.len()
                )));
            }
            data.extend_from_slice(&vector.values);
        }

        Ok(Self {
            dimensions,
            data,
            len: vectors.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The `k` stored vectors closest to `query`, nearest first.
    ///
    /// Returns `min(k, len)` hits. Equal distances keep insertion order.
    /// An empty index or `k == 0` yields no hits.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(PatisserieError::InvalidInput(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(index, row)| Neighbor {
                index,
                distance: squared_l2(row, query),
            })
            .collect();

        // stable: ties stay in insertion order
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
