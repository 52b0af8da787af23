//! Cosine similarity and exact top-k ranking over a [`CorpusIndex`].
//!
//! Every stored vector is scored against the query (O(N·D)) while a bounded
//! min-heap keeps the best `k` candidates (O(N log k)). The survivors are
//! sorted by score descending, then by record id ascending, so results are a
//! deterministic total order regardless of heap internals.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use tracing::debug;

use semsearch_core::error::{Result, SemsearchError};
use semsearch_core::types::{RecordId, ScoredResult};

use crate::corpus::{check_vector, CorpusIndex, CorpusState};

/// Euclidean norm, accumulated in f64.
pub fn magnitude(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

/// Cosine similarity between two vectors of equal length.
///
/// Returns 0.0 if either vector has zero magnitude. Vectors of different
/// length also score 0.0; callers that care validate dimensions first.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    cosine_with_norms(a, magnitude(a), b, magnitude(b))
}

fn cosine_with_norms(a: &[f32], norm_a: f64, b: &[f32], norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    // Rounding can push parallel vectors a hair past 1.0.
    (dot(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Heap entry ordered so that `Greater` means "ranks earlier".
#[derive(Debug, Clone, Copy)]
struct Ranked {
    score: f64,
    id: RecordId,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        // Scores are finite (inputs are validated), so total_cmp matches
        // numeric order. Lower ids rank earlier on ties.
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl From<Ranked> for ScoredResult {
    fn from(r: Ranked) -> Self {
        ScoredResult {
            record_id: r.id,
            score: r.score,
        }
    }
}

/// Keep the `k` best-ranked entries seen so far.
struct TopK {
    k: usize,
    heap: BinaryHeap<Reverse<Ranked>>,
}

impl TopK {
    fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
        }
    }

    fn offer(&mut self, candidate: Ranked) {
        if self.heap.len() < self.k {
            self.heap.push(Reverse(candidate));
        } else if let Some(Reverse(worst)) = self.heap.peek() {
            if candidate > *worst {
                self.heap.pop();
                self.heap.push(Reverse(candidate));
            }
        }
    }

    fn into_sorted(self) -> Vec<ScoredResult> {
        // Ascending order of Reverse<Ranked> is best-first.
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(r)| r.into())
            .collect()
    }
}

/// Read-only exact nearest-neighbour search over a shared corpus.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    corpus: Arc<CorpusIndex>,
}

impl SimilarityEngine {
    pub fn new(corpus: Arc<CorpusIndex>) -> Self {
        Self { corpus }
    }

    /// Return the `k` records most similar to `query`, best first.
    ///
    /// The result length is `min(k, corpus size)`. Errors: `InvalidK` for
    /// `k == 0`, `EmptyCorpus` before any insert, `DimensionMismatch` when the
    /// query length differs from the corpus dimension, `EmptyVector` and
    /// `InvalidValue` for malformed queries.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredResult>> {
        if k == 0 {
            return Err(SemsearchError::InvalidK(k));
        }
        let state = self.corpus.read()?;
        let results = rank(&state, query, k)?;
        debug!(
            k,
            candidates = state.len(),
            returned = results.len(),
            "Similarity search completed"
        );
        Ok(results)
    }

    /// Run [`SimilarityEngine::search`] for several queries against one
    /// consistent view of the corpus.
    ///
    /// Fails on the first invalid query; no partial result list is returned.
    pub fn search_many(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<Vec<ScoredResult>>> {
        if k == 0 {
            return Err(SemsearchError::InvalidK(k));
        }
        let state = self.corpus.read()?;
        queries.iter().map(|q| rank(&state, q, k)).collect()
    }

    /// Cosine similarity between `query` and one stored record.
    pub fn score(&self, query: &[f32], id: RecordId) -> Result<f64> {
        let state = self.corpus.read()?;
        check_vector(query, Some(state.dimension()?))?;
        let record = state.get(id)?;
        Ok(cosine_similarity(query, &record.vector))
    }

    /// The corpus this engine reads from.
    pub fn corpus(&self) -> &CorpusIndex {
        &self.corpus
    }
}

fn rank(state: &CorpusState, query: &[f32], k: usize) -> Result<Vec<ScoredResult>> {
    let dimension = state.dimension()?;
    check_vector(query, Some(dimension))?;

    let query_norm = magnitude(query);
    let mut top = TopK::new(k);
    for (record, norm) in state.entries() {
        top.offer(Ranked {
            score: cosine_with_norms(query, query_norm, &record.vector, norm),
            id: record.id,
        });
    }
    Ok(top.into_sorted())
}
