//! Vector table with incrementally maintained pairwise similarities
//!
//! Recording a vector under id `k` stores it, then writes `dot(v_j, v_k)` into
//! `scores[j][k]` for every stored id `j` (including `k`). Row `k` is not
//! filled against older ids at that point; it fills in as later vectors are
//! recorded. Search does not read the scores.

use std::collections::HashMap;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::embedding::dot;

/// Memory vectors plus their pairwise similarity bookkeeping
#[derive(Debug, Default, Clone)]
pub struct SimilarityIndex {
    vectors: IndexMap<Uuid, Vec<f32>>,
    scores: HashMap<Uuid, HashMap<Uuid, f32>>,
}

impl SimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `vector` under `id` (replacing any previous one) and fill column `id`
    pub fn record(&mut self, id: Uuid, vector: Vec<f32>) {
        self.vectors.insert(id, vector);
        let Some(vector) = self.vectors.get(&id) else {
            return;
        };

        for (row_id, row_vector) in &self.vectors {
            self.scores
                .entry(*row_id)
                .or_default()
                .insert(id, dot(row_vector, vector));
        }
    }

    /// Drop the vector, its row, and every score keyed by `id`.
    ///
    /// Returns the removed vector, if any.
    pub fn forget(&mut self, id: &Uuid) -> Option<Vec<f32>> {
        let removed = self.vectors.shift_remove(id);
        self.scores.remove(id);
        for row in self.scores.values_mut() {
            row.remove(id);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.vectors.clear();
        self.scores.clear();
    }

    pub fn vector(&self, id: &Uuid) -> Option<&[f32]> {
        self.vectors.get(id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.vectors.contains_key(id)
    }

    /// Score stored at `scores[row][column]`, if that cell has been written
    pub fn score(&self, row: &Uuid, column: &Uuid) -> Option<f32> {
        self.scores.get(row).and_then(|r| r.get(column)).copied()
    }

    /// All written cells of one row
    pub fn row(&self, row: &Uuid) -> Option<&HashMap<Uuid, f32>> {
        self.scores.get(row)
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Ids in recording order
    pub fn ids(&self) -> impl Iterator<Item = &Uuid> {
        self.vectors.keys()
    }
}
