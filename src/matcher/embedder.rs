use super::{EmbeddingModel, MatcherError};

/// Output dimension of all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

#[cfg(feature = "onnx-embeddings")]
mod onnx {
    use std::path::Path;
    use std::sync::Mutex;

    use ort::session::Session;

    use super::{EmbeddingModel, MatcherError, EMBEDDING_DIM};

    /// all-MiniLM-L6-v2 sentence embeddings through ONNX Runtime.
    ///
    /// `model_dir` must contain `model.onnx` and `tokenizer.json`. The
    /// session sits behind a Mutex because `Session::run` takes `&mut self`.
    pub struct OnnxEmbedder {
        session: Mutex<Session>,
        tokenizer: tokenizers::Tokenizer,
    }

    impl OnnxEmbedder {
        pub fn load(model_dir: &Path) -> Result<Self, MatcherError> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(MatcherError::ModelNotFound(model_path));
            }
            if !tokenizer_path.exists() {
                return Err(MatcherError::ModelNotFound(tokenizer_path));
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| MatcherError::ModelInit(e.to_string()))?
                .with_intra_threads(2)
                .map_err(|e: ort::Error| MatcherError::ModelInit(e.to_string()))?
                .commit_from_file(&model_path)
                .map_err(|e: ort::Error| MatcherError::ModelInit(format!("ONNX load failed: {e}")))?;

            let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| MatcherError::ModelInit(format!("Tokenizer load failed: {e}")))?;

            tracing::info!(dir = %model_dir.display(), "ONNX embedder loaded");

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
            })
        }

        /// Mean-pooled, L2-normalised sentence embedding.
        fn infer(&self, text: &str) -> Result<Vec<f32>, MatcherError> {
            use ort::value::TensorRef;

            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| MatcherError::Tokenization(e.to_string()))?;

            let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();
            let token_type_ids: Vec<i64> =
                encoding.get_type_ids().iter().map(|&t| t as i64).collect();
            let seq_len = input_ids.len();

            let to_array = |values: Vec<i64>| {
                ndarray::Array2::from_shape_vec((1, seq_len), values)
                    .map_err(|e| MatcherError::Embedding(e.to_string()))
            };
            let ids_array = to_array(input_ids)?;
            let mask_array = to_array(attention_mask.clone())?;
            let type_array = to_array(token_type_ids)?;

            let ids_tensor = TensorRef::from_array_view(&ids_array)
                .map_err(|e| MatcherError::Embedding(e.to_string()))?;
            let mask_tensor = TensorRef::from_array_view(&mask_array)
                .map_err(|e| MatcherError::Embedding(e.to_string()))?;
            let type_tensor = TensorRef::from_array_view(&type_array)
                .map_err(|e| MatcherError::Embedding(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| MatcherError::Embedding("Session lock poisoned".to_string()))?;
            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
                .map_err(|e| MatcherError::Embedding(format!("ONNX inference failed: {e}")))?;

            // [1, seq_len, 384] token embeddings
            let (shape, output) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| MatcherError::Embedding(format!("Output extraction: {e}")))?;
            if shape.len() != 3 || shape[2] as usize != EMBEDDING_DIM {
                return Err(MatcherError::Embedding(format!(
                    "Unexpected output shape: {shape:?}, expected [1, {seq_len}, {EMBEDDING_DIM}]"
                )));
            }

            let mut pooled = vec![0.0f32; EMBEDDING_DIM];
            let mut mask_sum = 0.0f32;
            for (token_idx, &mask) in attention_mask.iter().enumerate().take(seq_len) {
                let mask = mask as f32;
                mask_sum += mask;
                let offset = token_idx * EMBEDDING_DIM;
                for (dim_idx, p) in pooled.iter_mut().enumerate() {
                    *p += output[offset + dim_idx] * mask;
                }
            }
            if mask_sum > 0.0 {
                for val in &mut pooled {
                    *val /= mask_sum;
                }
            }

            super::l2_normalize(&mut pooled);
            Ok(pooled)
        }
    }

    impl EmbeddingModel for OnnxEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, MatcherError> {
            self.infer(text)
        }

        fn dimension(&self) -> usize {
            EMBEDDING_DIM
        }
    }
}

#[cfg(feature = "onnx-embeddings")]
pub use onnx::OnnxEmbedder;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "as", "be", "for", "in", "is", "it", "must", "of", "on", "or", "such",
    "the", "to", "with",
];

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(token: &str) -> u64 {
    token
        .bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
}

fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vec.iter_mut() {
            *val /= norm;
        }
    }
}

/// Deterministic bag-of-words embedder using signed feature hashing.
///
/// Fallback when the ONNX model is not built in or not installed, and the
/// embedder used in tests. Only shared vocabulary scores above zero.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(EMBEDDING_DIM)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, MatcherError> {
        let mut vec = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let h = fnv1a(&token);
            let slot = (h % self.dimension as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            vec[slot] += sign;
        }

        l2_normalize(&mut vec);
        Ok(vec)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_returns_unit_vector_of_dimension() {
        let e = HashingEmbedder::new();
        let v = e.embed("perpendicularity of a boss").unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn embed_is_deterministic_and_case_insensitive() {
        let e = HashingEmbedder::new();
        assert_eq!(e.embed("Flatness").unwrap(), e.embed("flatness").unwrap());
    }

    #[test]
    fn empty_and_stopword_text_is_zero_vector() {
        let e = HashingEmbedder::with_dimension(16);
        assert!(e.embed("").unwrap().iter().all(|x| *x == 0.0));
        assert!(e.embed("the and of").unwrap().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn batch_matches_single() {
        let e = HashingEmbedder::new();
        let batch = e.embed_batch(&["hole", "shaft"]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], e.embed("shaft").unwrap());
    }

    #[test]
    fn tokenizer_splits_snake_case() {
        let t: Vec<String> = tokens("bearing_bore_concentric Boss").collect();
        assert_eq!(t, vec!["bearing", "bore", "concentric", "boss"]);
    }
}
