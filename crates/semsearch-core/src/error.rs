use thiserror::Error;

/// Top-level error type for the semsearch system.
///
/// Structural violations (`DimensionMismatch`, `EmptyVector`, `EmptyCorpus`,
/// `NotFound`, `InvalidK`, `InvalidValue`) are caller errors and are never
/// retried internally. `MissingTextField` is a per-record ingestion condition;
/// the retrieval service reports it in its ingestion summary instead of
/// aborting a load.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SemsearchError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector must have at least one component")]
    EmptyVector,

    #[error("Corpus contains no records")]
    EmptyCorpus,

    #[error("Record {id} not found (corpus size {size})")]
    NotFound { id: usize, size: usize },

    #[error("Invalid k: {0} (must be at least 1)")]
    InvalidK(usize),

    #[error("Record is missing text field '{field}'")]
    MissingTextField { field: String },

    #[error("Invalid value {value} at component {index}")]
    InvalidValue { index: usize, value: f32 },

    #[error("Bulk load failed at item {index}: {source}")]
    BulkLoad {
        index: usize,
        #[source]
        source: Box<SemsearchError>,
    },

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Record source error at line {line}: {message}")]
    Source { line: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corpus lock poisoned by a panic in another thread")]
    LockPoisoned,
}

impl From<toml::de::Error> for SemsearchError {
    fn from(err: toml::de::Error) -> Self {
        SemsearchError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SemsearchError {
    fn from(err: toml::ser::Error) -> Self {
        SemsearchError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SemsearchError {
    fn from(err: serde_json::Error) -> Self {
        SemsearchError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for semsearch operations.
pub type Result<T> = std::result::Result<T, SemsearchError>;
