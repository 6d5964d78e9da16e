//! Standards matching: embed the analysis query and rank ASME Y14.5
//! characteristics by cosine similarity.

pub mod embedder;
pub mod index;

pub use embedder::{HashingEmbedder, EMBEDDING_DIM};
#[cfg(feature = "onnx-embeddings")]
pub use embedder::OnnxEmbedder;
pub use index::StandardsIndex;

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::CollaboratorError;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Embedding model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Embedding model failed to load: {0}")]
    ModelInit(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl From<MatcherError> for CollaboratorError {
    fn from(e: MatcherError) -> Self {
        CollaboratorError::Backend(e.to_string())
    }
}

/// Embedding model abstraction
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, MatcherError>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, MatcherError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize;
}
