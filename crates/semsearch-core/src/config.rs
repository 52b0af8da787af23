use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SemsearchError};
use crate::types::MissingTextPolicy;

/// Top-level configuration for semsearch.
///
/// Loaded from `~/.semsearch/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemsearchConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl SemsearchConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SemsearchConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist, cannot be parsed, or fails validation.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.encoder.dimensions == 0 {
            return Err(SemsearchError::Config(
                "encoder.dimensions must be at least 1".to_string(),
            ));
        }
        if self.corpus.batch_size == 0 {
            return Err(SemsearchError::Config(
                "corpus.batch_size must be at least 1".to_string(),
            ));
        }
        if self.corpus.text_field.trim().is_empty() {
            return Err(SemsearchError::Config(
                "corpus.text_field must not be empty".to_string(),
            ));
        }
        if self.search.default_top_k == 0 {
            return Err(SemsearchError::Config(
                "search.default_top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Which encoder implementation turns text into vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderBackend {
    /// Deterministic hash-derived vectors. Always available.
    #[default]
    Hash,
    /// Sentence-transformer model run through ONNX Runtime.
    Onnx,
}

/// Encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub backend: EncoderBackend,
    /// Sentence-transformer model name.
    pub model: String,
    /// Directory containing `model.onnx` and `tokenizer.json`.
    pub model_dir: Option<String>,
    /// Output dimension of the hash encoder.
    pub dimensions: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            backend: EncoderBackend::Hash,
            model: "all-MiniLM-L6-v2".to_string(),
            model_dir: None,
            dimensions: 384,
        }
    }
}

/// Corpus ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Metadata key whose string value is embedded for each record.
    pub text_field: String,
    /// Maximum number of records read from the source.
    pub limit: usize,
    /// Number of texts per `encode_many` call.
    pub batch_size: usize,
    /// Handling of records without usable text.
    pub missing_text: MissingTextPolicy,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            text_field: "reviewText".to_string(),
            limit: 1000,
            batch_size: 32,
            missing_text: MissingTextPolicy::Skip,
        }
    }
}

/// Query and result display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of results returned when the caller does not choose.
    pub default_top_k: usize,
    /// Metadata keys shown next to each hit.
    pub result_fields: Vec<String>,
    /// Characters of the text field shown per hit.
    pub preview_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            result_fields: vec![
                "overall".to_string(),
                "reviewerName".to_string(),
                "asin".to_string(),
            ],
            preview_chars: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = SemsearchConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.encoder.backend, EncoderBackend::Hash);
        assert_eq!(config.encoder.model, "all-MiniLM-L6-v2");
        assert!(config.encoder.model_dir.is_none());
        assert_eq!(config.encoder.dimensions, 384);
        assert_eq!(config.corpus.text_field, "reviewText");
        assert_eq!(config.corpus.limit, 1000);
        assert_eq!(config.corpus.batch_size, 32);
        assert_eq!(config.corpus.missing_text, MissingTextPolicy::Skip);
        assert_eq!(config.search.default_top_k, 5);
        assert_eq!(
            config.search.result_fields,
            vec!["overall", "reviewerName", "asin"]
        );
        assert_eq!(config.search.preview_chars, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[encoder]
backend = "onnx"
model = "paraphrase-MiniLM-L3-v2"
model_dir = "/models/minilm"
dimensions = 128

[corpus]
text_field = "summary"
limit = 250
batch_size = 8
missing_text = "placeholder"

[search]
default_top_k = 10
result_fields = ["asin"]
preview_chars = 80
"#;
        let file = create_temp_config(content);
        let config = SemsearchConfig::load(file.path()).unwrap();

        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.encoder.backend, EncoderBackend::Onnx);
        assert_eq!(config.encoder.model, "paraphrase-MiniLM-L3-v2");
        assert_eq!(config.encoder.model_dir.as_deref(), Some("/models/minilm"));
        assert_eq!(config.encoder.dimensions, 128);
        assert_eq!(config.corpus.text_field, "summary");
        assert_eq!(config.corpus.limit, 250);
        assert_eq!(config.corpus.batch_size, 8);
        assert_eq!(config.corpus.missing_text, MissingTextPolicy::Placeholder);
        assert_eq!(config.search.default_top_k, 10);
        assert_eq!(config.search.result_fields, vec!["asin"]);
        assert_eq!(config.search.preview_chars, 80);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[corpus]
limit = 10
"#;
        let file = create_temp_config(content);
        let config = SemsearchConfig::load(file.path()).unwrap();
        assert_eq!(config.corpus.limit, 10);
        assert_eq!(config.corpus.text_field, "reviewText");
        assert_eq!(config.corpus.batch_size, 32);
        assert_eq!(config.search.default_top_k, 5);
    }

    #[test]
    fn test_config_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = SemsearchConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.corpus.limit, 1000);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = SemsearchConfig::load(file.path());
        assert!(matches!(result, Err(SemsearchError::Config(_))));
    }

    #[test]
    fn test_load_rejects_zero_batch_size() {
        let file = create_temp_config("[corpus]\nbatch_size = 0\n");
        let err = SemsearchConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SemsearchConfig::default();
        config.encoder.dimensions = 0;
        assert!(config.validate().is_err());

        let mut config = SemsearchConfig::default();
        config.corpus.text_field = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = SemsearchConfig::default();
        config.search.default_top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = SemsearchConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.corpus.text_field, "reviewText");
    }

    #[test]
    fn test_load_or_default_invalid_values() {
        let file = create_temp_config("[search]\ndefault_top_k = 0\n");
        let config = SemsearchConfig::load_or_default(file.path());
        assert_eq!(config.search.default_top_k, 5);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = SemsearchConfig::default();
        config.corpus.missing_text = MissingTextPolicy::Placeholder;
        config.encoder.model_dir = Some("/opt/models".to_string());
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = SemsearchConfig::load(&path).unwrap();
        assert_eq!(reloaded.corpus.missing_text, MissingTextPolicy::Placeholder);
        assert_eq!(reloaded.encoder.model_dir.as_deref(), Some("/opt/models"));
        assert_eq!(reloaded.search.result_fields, config.search.result_fields);
    }
}
