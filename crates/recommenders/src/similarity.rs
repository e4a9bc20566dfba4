//! Cosine similarity and ranking helpers shared by the matrix-based
//! strategies.

use ndarray::{Array2, Axis};
use std::collections::{BTreeSet, HashMap};

/// Row-wise cosine similarity: entry `(i, j)` is the cosine of rows `i`
/// and `j`. All-zero rows have similarity 0 with everything.
pub fn cosine_similarity(rows: &Array2<f64>) -> Array2<f64> {
    let mut normalized = rows.clone();
    for mut row in normalized.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
    normalized.dot(&normalized.t())
}

/// Sort `(id, score)` pairs best first and keep `count` of them. The sort is
/// stable, so equal scores keep their input order.
pub fn rank_descending<T>(mut scored: Vec<(T, f64)>, count: usize) -> Vec<(T, f64)> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(count);
    scored
}

/// Dense positions for a sorted set of string keys.
#[derive(Debug, Clone, Default)]
pub struct Index {
    keys: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Index {
    pub fn new<'a>(keys: impl IntoIterator<Item = &'a String>) -> Self {
        let keys: Vec<String> = keys
            .into_iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let positions = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i))
            .collect();
        Self { keys, positions }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn key(&self, position: usize) -> &str {
        &self.keys[position]
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}
