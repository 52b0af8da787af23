//! Append-only, in-memory corpus of fixed-dimension embedding vectors.
//!
//! Records are addressed by their insertion position. The dimension is fixed
//! by the first successful insert. Magnitudes are computed once on insert and
//! cached next to the records so that search never recomputes them.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use semsearch_core::error::{Result, SemsearchError};
use semsearch_core::types::{Metadata, RecordId, VectorRecord};

use crate::similarity::magnitude;

/// Interior state guarded by the corpus lock.
#[derive(Debug, Default)]
pub(crate) struct CorpusState {
    dimension: Option<usize>,
    records: Vec<Arc<VectorRecord>>,
    magnitudes: Vec<f64>,
}

impl CorpusState {
    pub(crate) fn dimension(&self) -> Result<usize> {
        self.dimension.ok_or(SemsearchError::EmptyCorpus)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Records paired with their cached magnitudes, in id order.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (&VectorRecord, f64)> + '_ {
        self.records
            .iter()
            .map(Arc::as_ref)
            .zip(self.magnitudes.iter().copied())
    }

    pub(crate) fn get(&self, id: RecordId) -> Result<&Arc<VectorRecord>> {
        self.records.get(id.index()).ok_or(SemsearchError::NotFound {
            id: id.index(),
            size: self.records.len(),
        })
    }

    /// Validate then append. Nothing is mutated when validation fails.
    fn push(&mut self, vector: Vec<f32>, metadata: Metadata) -> Result<RecordId> {
        check_vector(&vector, self.dimension)?;

        let id = RecordId::new(self.records.len());
        let norm = magnitude(&vector);
        if self.dimension.is_none() {
            self.dimension = Some(vector.len());
        }
        self.records.push(Arc::new(VectorRecord {
            id,
            vector,
            metadata,
        }));
        self.magnitudes.push(norm);
        Ok(id)
    }
}

/// Reject empty vectors, non-finite components, and (once known) a wrong dimension.
pub(crate) fn check_vector(vector: &[f32], expected: Option<usize>) -> Result<()> {
    if vector.is_empty() {
        return Err(SemsearchError::EmptyVector);
    }
    if let Some(expected) = expected {
        if vector.len() != expected {
            return Err(SemsearchError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
    }
    if let Some((index, value)) = vector.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(SemsearchError::InvalidValue {
            index,
            value: *value,
        });
    }
    Ok(())
}

/// Append-only store of [`VectorRecord`]s.
///
/// Thread-safe via an interior `RwLock`: inserts take the write lock, reads
/// (`get`, `snapshot`, search) share the read lock.
#[derive(Debug, Default)]
pub struct CorpusIndex {
    state: RwLock<CorpusState>,
}

impl CorpusIndex {
    /// Create a new empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vector with its metadata and return the assigned id.
    ///
    /// Fails with `EmptyVector` for a zero-length vector and with
    /// `DimensionMismatch` once the corpus dimension is fixed. A failed insert
    /// leaves the corpus unchanged.
    pub fn insert(&self, vector: Vec<f32>, metadata: Metadata) -> Result<RecordId> {
        let mut state = self.write()?;
        let id = state.push(vector, metadata)?;
        debug!(id = %id, size = state.len(), "Record inserted");
        Ok(id)
    }

    /// Insert every item in order, holding the write lock for the whole load.
    ///
    /// Stops at the first failing item and returns `BulkLoad` carrying its
    /// position in the input. Items before it stay inserted. Returns the ids
    /// assigned on success.
    pub fn bulk_load<I>(&self, items: I) -> Result<Vec<RecordId>>
    where
        I: IntoIterator<Item = (Vec<f32>, Metadata)>,
    {
        let mut state = self.write()?;
        let mut ids = Vec::new();
        for (index, (vector, metadata)) in items.into_iter().enumerate() {
            match state.push(vector, metadata) {
                Ok(id) => ids.push(id),
                Err(source) => {
                    debug!(index, inserted = ids.len(), "Bulk load stopped");
                    return Err(SemsearchError::BulkLoad {
                        index,
                        source: Box::new(source),
                    });
                }
            }
        }
        debug!(inserted = ids.len(), size = state.len(), "Bulk load finished");
        Ok(ids)
    }

    /// Number of records currently stored.
    pub fn size(&self) -> usize {
        self.state.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Alias for [`CorpusIndex::size`].
    pub fn len(&self) -> usize {
        self.size()
    }

    /// Return true if the corpus holds no records.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Fetch a record by id. Fails with `NotFound` when out of range.
    pub fn get(&self, id: RecordId) -> Result<Arc<VectorRecord>> {
        self.read()?.get(id).cloned()
    }

    /// The shared vector dimension. Fails with `EmptyCorpus` before the first insert.
    pub fn dimension(&self) -> Result<usize> {
        self.read()?.dimension()
    }

    /// A consistent point-in-time view of all records.
    ///
    /// Records are shared with the corpus, so a snapshot is cheap and stays
    /// valid while later inserts proceed.
    pub fn snapshot(&self) -> Result<CorpusSnapshot> {
        let state = self.read()?;
        Ok(CorpusSnapshot {
            dimension: state.dimension,
            records: state.records.clone(),
        })
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, CorpusState>> {
        self.state.read().map_err(|_| SemsearchError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CorpusState>> {
        self.state.write().map_err(|_| SemsearchError::LockPoisoned)
    }
}

/// Immutable copy of the corpus record list taken by [`CorpusIndex::snapshot`].
#[derive(Debug, Clone)]
pub struct CorpusSnapshot {
    dimension: Option<usize>,
    records: Vec<Arc<VectorRecord>>,
}

impl CorpusSnapshot {
    /// Dimension at snapshot time, `None` if the corpus was empty.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&VectorRecord> {
        self.records.get(id.index()).map(Arc::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VectorRecord> + '_ {
        self.records.iter().map(Arc::as_ref)
    }
}
