//! Encoder trait and implementations.
//!
//! - `HashEncoder` builds deterministic bag-of-words vectors with the hashing
//!   trick. Texts that share words land close together, which is enough for
//!   tests and offline demos without a model.
//! - `OnnxEncoder` (feature `onnx`) runs a sentence-transformer ONNX export
//!   such as all-MiniLM-L6-v2 through ort and mean-pools token embeddings.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;

use semsearch_core::error::{Result, SemsearchError};

#[cfg(feature = "onnx")]
pub use onnx::OnnxEncoder;

/// Turns text into fixed-dimension vectors.
///
/// Implementations must be deterministic within a session: the same text
/// always yields the same vector. The core relies on this for reproducible
/// rankings but does not check it.
pub trait Encoder: Send + Sync {
    /// Encode one text.
    fn encode(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;

    /// Encode several texts, returning one vector per input in order.
    ///
    /// The default encodes one text at a time.
    fn encode_many(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.encode(text).await?);
            }
            Ok(vectors)
        }
    }

    /// Dimension of the vectors this encoder produces.
    fn dimensions(&self) -> usize;
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`Encoder`] for runtime backend selection.
///
/// A blanket implementation covers every `Encoder`, and
/// `Box<dyn DynEncoder>` implements `Encoder` again so boxed encoders can be
/// handed to generic code.
pub trait DynEncoder: Send + Sync {
    fn encode_boxed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;

    fn encode_many_boxed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

    fn dimensions(&self) -> usize;
}

impl<T: Encoder> DynEncoder for T {
    fn encode_boxed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        Box::pin(self.encode(text))
    }

    fn encode_many_boxed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        Box::pin(self.encode_many(texts))
    }

    fn dimensions(&self) -> usize {
        Encoder::dimensions(self)
    }
}

impl Encoder for Box<dyn DynEncoder> {
    fn encode(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send {
        async move { (**self).encode_boxed(text).await }
    }

    fn encode_many(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send {
        async move { (**self).encode_many_boxed(texts).await }
    }

    fn dimensions(&self) -> usize {
        DynEncoder::dimensions(&**self)
    }
}

// ---------------------------------------------------------------------------
// HashEncoder - deterministic hashing-trick vectors
// ---------------------------------------------------------------------------

/// Deterministic encoder that hashes lowercase word tokens into buckets.
///
/// Each token adds +1 or -1 (sign taken from the hash) to one bucket and the
/// result is L2-normalized. Text without any alphanumeric token encodes to the
/// zero vector, which scores 0 against everything.
#[derive(Debug, Clone)]
pub struct HashEncoder {
    dimensions: usize,
}

impl HashEncoder {
    pub const DEFAULT_DIMENSIONS: usize = 384;

    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = vec![0.0f32; self.dimensions];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        for token in tokens {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h % self.dimensions as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            result[bucket] += sign;
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }
        result
    }
}

impl Default for HashEncoder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

impl Encoder for HashEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        if self.dimensions == 0 {
            return Err(SemsearchError::Encoder(
                "Hash encoder needs at least one dimension".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(SemsearchError::Encoder("Cannot encode empty text".to_string()));
        }
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// OnnxEncoder - sentence-transformer inference via ONNX Runtime
// ---------------------------------------------------------------------------

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use ort::session::Session;
    use ort::value::TensorRef;
    use tokenizers::Tokenizer;
    use tracing::info;

    use semsearch_core::error::{Result, SemsearchError};

    use super::Encoder;

    fn encoder_err(context: &str, e: impl std::fmt::Display) -> SemsearchError {
        SemsearchError::Encoder(format!("{context}: {e}"))
    }

    struct OnnxModel {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
    }

    /// ONNX Runtime-backed sentence-transformer encoder.
    ///
    /// Expects a model directory containing `model.onnx` and `tokenizer.json`.
    /// The model takes `input_ids`, `attention_mask` and `token_type_ids` and
    /// produces token embeddings, which are mean-pooled under the attention
    /// mask and L2-normalized.
    #[derive(Clone)]
    pub struct OnnxEncoder {
        model: Arc<OnnxModel>,
        dimensions: usize,
    }

    impl std::fmt::Debug for OnnxEncoder {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("OnnxEncoder")
                .field("dimensions", &self.dimensions)
                .finish()
        }
    }

    impl OnnxEncoder {
        /// Load a sentence-transformer model from the given directory.
        pub fn from_directory(model_dir: &Path) -> Result<Self> {
            Self::from_files(
                &model_dir.join("model.onnx"),
                &model_dir.join("tokenizer.json"),
            )
        }

        /// Load from explicit model and tokenizer file paths.
        pub fn from_files(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
            if !model_path.exists() {
                return Err(SemsearchError::Encoder(format!(
                    "ONNX model not found at {}",
                    model_path.display()
                )));
            }
            if !tokenizer_path.exists() {
                return Err(SemsearchError::Encoder(format!(
                    "Tokenizer not found at {}",
                    tokenizer_path.display()
                )));
            }

            let session = Session::builder()
                .map_err(|e| encoder_err("ONNX session builder", e))?
                .with_intra_threads(1)
                .map_err(|e| encoder_err("ONNX set threads", e))?
                .commit_from_file(model_path)
                .map_err(|e| encoder_err("ONNX load model", e))?;

            // Output is [batch, seq_len, hidden_dim]; fall back to MiniLM's 384.
            let dimensions = session
                .outputs()
                .first()
                .and_then(|out| out.dtype().tensor_shape())
                .and_then(|shape| shape.last().copied())
                .map(|d| if d > 0 { d as usize } else { 384 })
                .unwrap_or(384);

            let tokenizer =
                Tokenizer::from_file(tokenizer_path).map_err(|e| encoder_err("Load tokenizer", e))?;

            info!(
                model = %model_path.display(),
                dimensions,
                "Loaded ONNX encoder"
            );

            Ok(Self {
                model: Arc::new(OnnxModel {
                    session: Mutex::new(session),
                    tokenizer,
                }),
                dimensions,
            })
        }
    }

    impl OnnxModel {
        fn encode_sync(&self, text: &str) -> Result<Vec<f32>> {
            if text.trim().is_empty() {
                return Err(SemsearchError::Encoder("Cannot encode empty text".to_string()));
            }

            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| encoder_err("Tokenization failed", e))?;

            let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();
            let token_type_ids: Vec<i64> =
                encoding.get_type_ids().iter().map(|&t| t as i64).collect();
            let seq_len = input_ids.len();

            let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
                .map_err(|e| encoder_err("input_ids array", e))?;
            let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone())
                .map_err(|e| encoder_err("attention_mask array", e))?;
            let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
                .map_err(|e| encoder_err("token_type_ids array", e))?;

            let ids_ref = TensorRef::from_array_view(&ids_array)
                .map_err(|e| encoder_err("TensorRef input_ids", e))?;
            let mask_ref = TensorRef::from_array_view(&mask_array)
                .map_err(|e| encoder_err("TensorRef attention_mask", e))?;
            let type_ref = TensorRef::from_array_view(&type_array)
                .map_err(|e| encoder_err("TensorRef token_type_ids", e))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| SemsearchError::Encoder("Session lock poisoned".to_string()))?;
            let outputs = session
                .run(ort::inputs![ids_ref, mask_ref, type_ref])
                .map_err(|e| encoder_err("ONNX inference failed", e))?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| encoder_err("Extract embeddings", e))?;
            let hidden_dim = match shape.iter().copied().collect::<Vec<i64>>().as_slice() {
                [_, .., last] => *last as usize,
                other => {
                    return Err(SemsearchError::Encoder(format!(
                        "Unexpected output shape: {other:?}"
                    )))
                }
            };

            let mut pooled = vec![0.0f32; hidden_dim];
            let mut count = 0.0f32;
            for (tok_idx, &mask_val) in attention_mask.iter().enumerate() {
                if mask_val > 0 {
                    let offset = tok_idx * hidden_dim;
                    for (dim, slot) in pooled.iter_mut().enumerate() {
                        *slot += data[offset + dim];
                    }
                    count += 1.0;
                }
            }
            if count > 0.0 {
                for val in &mut pooled {
                    *val /= count;
                }
            }

            let norm: f32 = pooled.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                for val in &mut pooled {
                    *val /= norm;
                }
            }
            Ok(pooled)
        }
    }

    impl Encoder for OnnxEncoder {
        async fn encode(&self, text: &str) -> Result<Vec<f32>> {
            // Inference is CPU-bound; keep it off the async workers.
            let model = Arc::clone(&self.model);
            let text = text.to_string();
            tokio::task::spawn_blocking(move || model.encode_sync(&text))
                .await
                .map_err(|e| encoder_err("Encoder task panicked", e))?
        }

        async fn encode_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let model = Arc::clone(&self.model);
            let texts = texts.to_vec();
            tokio::task::spawn_blocking(move || {
                texts.iter().map(|t| model.encode_sync(t)).collect()
            })
            .await
            .map_err(|e| encoder_err("Encoder task panicked", e))?
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_onnx_missing_model() {
            let result = OnnxEncoder::from_directory(Path::new("/nonexistent"));
            assert!(matches!(result, Err(SemsearchError::Encoder(_))));
        }
    }
}
