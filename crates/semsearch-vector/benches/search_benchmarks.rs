//! Benchmarks for exact top-k search and end-to-end retrieval.
//!
//! Uses 1,000 records by default. Set `BENCH_FULL_SCALE=1` to run against
//! 100,000 records:
//!
//! ```bash
//! BENCH_FULL_SCALE=1 cargo bench -p semsearch-vector
//! ```

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use semsearch_vector::encoder::{Encoder, HashEncoder};
use semsearch_vector::retrieval::{IngestOptions, RetrievalService};
use semsearch_vector::source::from_records;
use semsearch_vector::{CorpusIndex, SimilarityEngine};

const CI_RECORD_COUNT: usize = 1_000;
const FULL_SCALE_RECORD_COUNT: usize = 100_000;

fn record_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_RECORD_COUNT
    } else {
        CI_RECORD_COUNT
    }
}

/// A review-like text made unique by its index.
fn review_text(index: usize) -> String {
    let products = ["Office", "Photoshop", "Paint Shop", "TurboTax", "Norton"];
    let verdicts = ["works great", "keeps crashing", "too expensive", "easy to install"];
    format!(
        "{} {} after the latest update, review number {}",
        products[index % products.len()],
        verdicts[index % verdicts.len()],
        index
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
}

fn build_service(rt: &tokio::runtime::Runtime, count: usize) -> (RetrievalService, HashEncoder) {
    let encoder = HashEncoder::default();
    let service = RetrievalService::new(IngestOptions::default());
    let records = (0..count).map(|i| match json!({ "reviewText": review_text(i), "n": i }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    });

    let summary = rt
        .block_on(service.build_corpus(from_records(records), &encoder, count))
        .expect("build failed");
    assert_eq!(summary.inserted, count);
    (service, encoder)
}

fn bench_similarity_search(c: &mut Criterion) {
    let count = record_count();
    let rt = runtime();
    let (service, encoder) = build_service(&rt, count);
    let engine: &SimilarityEngine = service.engine();

    let query = rt
        .block_on(encoder.encode("photoshop crashing after update"))
        .expect("query encode failed");

    let mut group = c.benchmark_group("similarity_search");
    group.measurement_time(Duration::from_secs(10));
    for k in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new(format!("top_k_{count}"), k), &k, |b, &k| {
            b.iter(|| engine.search(&query, k).expect("search failed"));
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let count = record_count();
    let rt = runtime();
    let (service, encoder) = build_service(&rt, count);

    let mut group = c.benchmark_group("retrieval_query");
    group.measurement_time(Duration::from_secs(10));
    group.bench_function(format!("encode_and_rank_top10_{count}"), |b| {
        b.iter(|| {
            rt.block_on(service.query("Is Microsoft Office any good?", 10, &encoder))
                .expect("query failed")
        });
    });
    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    let dims = HashEncoder::DEFAULT_DIMENSIONS;
    let vector: Vec<f32> = (0..dims).map(|i| (i as f32).sin()).collect();

    c.bench_function("corpus_insert_1000", |b| {
        b.iter(|| {
            let corpus = Arc::new(CorpusIndex::new());
            for _ in 0..1_000 {
                corpus
                    .insert(vector.clone(), serde_json::Map::new())
                    .expect("insert failed");
            }
            corpus
        });
    });
}

criterion_group!(benches, bench_similarity_search, bench_query, bench_insert);
criterion_main!(benches);
