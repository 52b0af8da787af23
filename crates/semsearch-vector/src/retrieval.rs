//! Retrieval service: the bridge between external collaborators (record
//! sources, encoders) and the corpus / similarity engine pair.
//!
//! Building a corpus runs every record through:
//! 1. Text extraction (missing text is handled by [`MissingTextPolicy`])
//! 2. Batched encoding
//! 3. Corpus insertion
//!
//! Queries embed the text, rank it with the [`SimilarityEngine`], and join
//! each hit back to its record metadata.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use semsearch_core::config::CorpusConfig;
use semsearch_core::error::{Result, SemsearchError};
use semsearch_core::types::{
    IngestSummary, Metadata, MissingTextPolicy, RawRecord, RetrievalHit, ScoredResult,
};

use crate::corpus::CorpusIndex;
use crate::encoder::Encoder;
use crate::similarity::SimilarityEngine;
use crate::source::RecordSource;

/// Ingestion options for [`RetrievalService::build_corpus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// Metadata key embedded for each record.
    pub text_field: String,
    /// Texts per `encode_many` call.
    pub batch_size: usize,
    pub missing_text: MissingTextPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&CorpusConfig::default())
    }
}

impl From<&CorpusConfig> for IngestOptions {
    fn from(config: &CorpusConfig) -> Self {
        Self {
            text_field: config.text_field.clone(),
            batch_size: config.batch_size,
            missing_text: config.missing_text,
        }
    }
}

/// Pull the embedding text out of a record.
///
/// Absent, non-string, and blank values all count as missing. The text is
/// trimmed before embedding.
pub fn extract_text(record: &RawRecord, field: &str) -> Result<String> {
    match record.get(field).and_then(|v| v.as_str()).map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(SemsearchError::MissingTextField {
            field: field.to_string(),
        }),
    }
}

/// Orchestrates encoder, corpus and similarity engine for one corpus.
///
/// The service owns its corpus for its whole lifetime; the corpus is shared
/// read-only with the engine, so queries may run concurrently from clones of
/// the `Arc` returned by [`RetrievalService::corpus`].
#[derive(Debug)]
pub struct RetrievalService {
    corpus: Arc<CorpusIndex>,
    engine: SimilarityEngine,
    options: IngestOptions,
}

impl RetrievalService {
    /// Create a service over a fresh, empty corpus.
    pub fn new(options: IngestOptions) -> Self {
        Self::with_corpus(Arc::new(CorpusIndex::new()), options)
    }

    /// Create a service over an existing corpus.
    pub fn with_corpus(corpus: Arc<CorpusIndex>, options: IngestOptions) -> Self {
        let engine = SimilarityEngine::new(Arc::clone(&corpus));
        Self {
            corpus,
            engine,
            options,
        }
    }

    /// Read up to `limit` records from `source`, embed them and append them.
    ///
    /// Records with missing text never abort the load: they are skipped or
    /// stored as zero-vector placeholders according to the configured policy,
    /// and counted in the returned summary. Source, encoder and corpus errors
    /// abort the load; records already inserted stay in the corpus.
    pub async fn build_corpus<S, E>(
        &self,
        source: S,
        encoder: &E,
        limit: usize,
    ) -> Result<IngestSummary>
    where
        S: RecordSource,
        E: Encoder,
    {
        if self.options.batch_size == 0 {
            return Err(SemsearchError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }

        let started = Instant::now();
        let mut summary = IngestSummary::default();
        let mut batch = Batch::with_capacity(self.options.batch_size);

        for (position, record) in source.take(limit).enumerate() {
            let record = record?;
            summary.read += 1;

            match extract_text(&record, &self.options.text_field) {
                Ok(text) => {
                    batch.push(text, record);
                    if batch.len() >= self.options.batch_size {
                        self.flush(&mut batch, encoder, &mut summary).await?;
                    }
                }
                Err(SemsearchError::MissingTextField { field }) => {
                    warn!(position, field = %field, policy = ?self.options.missing_text, "Record has no text");
                    summary.missing_text.push(position);
                    match self.options.missing_text {
                        MissingTextPolicy::Skip => summary.skipped += 1,
                        MissingTextPolicy::Placeholder => {
                            // Keep insertion order: pending texts go first.
                            self.flush(&mut batch, encoder, &mut summary).await?;
                            let dimension = self
                                .corpus
                                .dimension()
                                .unwrap_or_else(|_| Encoder::dimensions(encoder));
                            let zero = vec![0.0f32; dimension];
                            self.corpus.insert(zero, record)?;
                            summary.placeholders += 1;
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
        self.flush(&mut batch, encoder, &mut summary).await?;

        info!(
            read = summary.read,
            inserted = summary.inserted,
            skipped = summary.skipped,
            placeholders = summary.placeholders,
            corpus_size = self.corpus.size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Corpus built"
        );
        Ok(summary)
    }

    async fn flush<E>(&self, batch: &mut Batch, encoder: &E, summary: &mut IngestSummary) -> Result<()>
    where
        E: Encoder,
    {
        if batch.is_empty() {
            return Ok(());
        }
        let vectors = encoder.encode_many(&batch.texts).await?;
        if vectors.len() != batch.len() {
            return Err(SemsearchError::Encoder(format!(
                "encoder returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            )));
        }

        let records = std::mem::take(&mut batch.records);
        batch.texts.clear();
        let count = records.len();
        for (vector, metadata) in vectors.into_iter().zip(records) {
            self.corpus.insert(vector, metadata)?;
            summary.inserted += 1;
        }
        debug!(count, corpus_size = self.corpus.size(), "Batch encoded");
        Ok(())
    }

    /// Embed `text` and return the `k` closest records with their metadata.
    ///
    /// Encoder and search errors are returned unchanged.
    pub async fn query<E>(&self, text: &str, k: usize, encoder: &E) -> Result<Vec<RetrievalHit>>
    where
        E: Encoder,
    {
        let started = Instant::now();
        let query_vector = encoder.encode(text).await?;
        let results = self.engine.search(&query_vector, k)?;
        let hits = self.enrich(results)?;
        info!(
            k,
            hits = hits.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query completed"
        );
        Ok(hits)
    }

    /// Run several queries with one batched encoder call.
    pub async fn query_many<E>(
        &self,
        texts: &[String],
        k: usize,
        encoder: &E,
    ) -> Result<Vec<Vec<RetrievalHit>>>
    where
        E: Encoder,
    {
        let vectors = encoder.encode_many(texts).await?;
        let ranked = self.engine.search_many(&vectors, k)?;
        debug!(queries = texts.len(), k, "Batch query completed");
        ranked.into_iter().map(|results| self.enrich(results)).collect()
    }

    fn enrich(&self, results: Vec<ScoredResult>) -> Result<Vec<RetrievalHit>> {
        results
            .into_iter()
            .map(|r| {
                let record = self.corpus.get(r.record_id)?;
                Ok(RetrievalHit {
                    record_id: r.record_id,
                    score: r.score,
                    metadata: record.metadata.clone(),
                })
            })
            .collect()
    }

    /// The corpus owned by this service.
    pub fn corpus(&self) -> &Arc<CorpusIndex> {
        &self.corpus
    }

    /// The similarity engine reading this service's corpus.
    pub fn engine(&self) -> &SimilarityEngine {
        &self.engine
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }
}

/// Texts waiting to be encoded, paired with the records they came from.
#[derive(Default)]
struct Batch {
    texts: Vec<String>,
    records: Vec<Metadata>,
}

impl Batch {
    fn with_capacity(n: usize) -> Self {
        Self {
            texts: Vec::with_capacity(n),
            records: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, text: String, record: Metadata) {
        self.texts.push(text);
        self.records.push(record);
    }

    fn len(&self) -> usize {
        self.texts.len()
    }

    fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}
