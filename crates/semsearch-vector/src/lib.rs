//! semsearch vector crate - corpus storage, exact cosine top-k search,
//! encoders, record sources, and the retrieval service.
//!
//! Provides an append-only in-memory corpus, a similarity engine with
//! deterministic ranking, an encoder trait with a hashing implementation
//! (plus an ONNX sentence-transformer behind the `onnx` feature), and the
//! service that ties ingestion and querying together.

pub mod corpus;
pub mod encoder;
pub mod retrieval;
pub mod similarity;
pub mod source;

pub use corpus::{CorpusIndex, CorpusSnapshot};
pub use encoder::{DynEncoder, Encoder, HashEncoder};
#[cfg(feature = "onnx")]
pub use encoder::OnnxEncoder;
pub use retrieval::{extract_text, IngestOptions, RetrievalService};
pub use similarity::{cosine_similarity, SimilarityEngine};
pub use source::{from_records, JsonLinesSource, RecordSource};
