//! semsearch application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Select the encoder backend (hash or ONNX)
//! 3. Stream the JSON Lines dataset into an in-memory corpus
//! 4. Run each query and print ranked, metadata-enriched results

mod cli;
mod report;

use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use semsearch_core::config::{EncoderBackend, EncoderConfig, SemsearchConfig};
use semsearch_core::error::{Result, SemsearchError};
use semsearch_vector::{DynEncoder, Encoder, HashEncoder, IngestOptions, JsonLinesSource, RetrievalService};

use cli::CliArgs;
use report::ReportLayout;

/// Pick the encoder named in the config.
fn build_encoder(config: &EncoderConfig) -> Result<Box<dyn DynEncoder>> {
    match config.backend {
        EncoderBackend::Hash => Ok(Box::new(HashEncoder::new(config.dimensions))),
        EncoderBackend::Onnx => onnx_encoder(config),
    }
}

#[cfg(feature = "onnx")]
fn onnx_encoder(config: &EncoderConfig) -> Result<Box<dyn DynEncoder>> {
    let dir = config.model_dir.as_deref().ok_or_else(|| {
        SemsearchError::Config("encoder.model_dir is required for the onnx backend".to_string())
    })?;
    let encoder = semsearch_vector::OnnxEncoder::from_directory(Path::new(dir))?;
    tracing::info!(model = %config.model, dir, "Using ONNX encoder");
    Ok(Box::new(encoder))
}

#[cfg(not(feature = "onnx"))]
fn onnx_encoder(_config: &EncoderConfig) -> Result<Box<dyn DynEncoder>> {
    Err(SemsearchError::Config(
        "encoder.backend = \"onnx\" needs a build with the `onnx` feature".to_string(),
    ))
}

fn init_tracing(level: &str) {
    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: CliArgs, config: SemsearchConfig, data_path: &Path) -> Result<()> {
    let encoder = build_encoder(&config.encoder)?;
    tracing::info!(
        backend = ?config.encoder.backend,
        dimensions = Encoder::dimensions(&encoder),
        "Encoder ready"
    );

    let limit = args.resolve_limit(&config);
    let top_k = args.resolve_top_k(&config);
    let service = RetrievalService::new(IngestOptions::from(&config.corpus));

    let source = JsonLinesSource::open(data_path)?;
    let summary = service.build_corpus(source, &encoder, limit).await?;
    println!(
        "Loaded {} records ({} skipped without text) from {}",
        summary.stored(),
        summary.skipped,
        data_path.display()
    );
    if summary.stored() == 0 {
        return Err(SemsearchError::EmptyCorpus);
    }

    let queries = args.resolve_queries();
    let results = service.query_many(&queries, top_k, &encoder).await?;

    let layout = ReportLayout {
        fields: config.search.result_fields.clone(),
        text_field: config.corpus.text_field.clone(),
        preview_chars: config.search.preview_chars,
    };
    for (query, hits) in queries.iter().zip(&results) {
        print!("{}", report::render_query(query, hits, &layout));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing starts so its log level can apply.
    let config_file = args.resolve_config_path();
    let loaded = if config_file.exists() {
        Some(SemsearchConfig::load(&config_file))
    } else {
        None
    };
    let config_level = match &loaded {
        Some(Ok(config)) => config.general.log_level.clone(),
        _ => SemsearchConfig::default().general.log_level,
    };
    init_tracing(&args.resolve_log_level(&config_level));

    tracing::info!("Starting semsearch v{}", env!("CARGO_PKG_VERSION"));
    let config = match loaded {
        Some(Ok(config)) => {
            tracing::info!(path = %config_file.display(), "Configuration loaded");
            config
        }
        Some(Err(e)) => {
            tracing::warn!(path = %config_file.display(), error = %e, "Invalid config, using defaults");
            SemsearchConfig::default()
        }
        None => {
            tracing::debug!(path = %config_file.display(), "No config file, using defaults");
            SemsearchConfig::default()
        }
    };

    let data_path = args.resolve_data_path();
    if let Err(e) = run(args, config, &data_path).await {
        tracing::error!(data = %data_path.display(), error = %e, "semsearch failed");
        return Err(e.into());
    }
    Ok(())
}
