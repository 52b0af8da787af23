use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Identifiers and metadata
// =============================================================================

/// Opaque, string-keyed attributes attached to a record.
pub type Metadata = Map<String, Value>;

/// A raw record as produced by a record source, before embedding.
pub type RawRecord = Map<String, Value>;

/// Stable position of a record in corpus insertion order.
///
/// Ids are assigned densely from 0 and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(usize);

impl RecordId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The position of the record in the corpus.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for RecordId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

// =============================================================================
// Records and results
// =============================================================================

/// One embedding vector plus the metadata of the record it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: RecordId,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

/// A reference into the corpus with its similarity to a query.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub record_id: RecordId,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f64,
}

/// A scored result joined back to its record metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub record_id: RecordId,
    pub score: f64,
    pub metadata: Metadata,
}

impl RetrievalHit {
    /// Look up a metadata attribute by key.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Look up a metadata attribute that holds a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

// =============================================================================
// Ingestion
// =============================================================================

/// What to do with a record whose text field is missing, not a string, or blank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTextPolicy {
    /// Leave the record out of the corpus. No id is consumed.
    #[default]
    Skip,
    /// Insert a zero vector so the record keeps a corpus slot. It always
    /// scores 0 against any query.
    Placeholder,
}

/// Outcome of a corpus build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Records pulled from the source (never more than the limit).
    pub read: usize,
    /// Records inserted with a real embedding.
    pub inserted: usize,
    /// Records left out because their text was missing.
    pub skipped: usize,
    /// Records inserted as zero-vector placeholders.
    pub placeholders: usize,
    /// Source positions (0-based) of every record with missing text.
    pub missing_text: Vec<usize>,
}

impl IngestSummary {
    /// Number of records that received a corpus id.
    pub fn stored(&self) -> usize {
        self.inserted + self.placeholders
    }
}
