//! Backend-agnostic embedding capability and the backend factory.

use std::path::Path;

use crate::config::{EmbeddingConfig, InferenceBackend};
use crate::errors::Result;
use crate::service::EmbeddingService;

/// A text embedder with an explicit model lifecycle.
///
/// `embed` blocks the calling thread; implementations must accept concurrent
/// calls from many threads.
pub trait TextEmbedding: Send + Sync {
    /// Load tokenizer and model from `dir`, replacing anything loaded.
    fn load_model(&self, dir: &Path) -> Result<()>;

    /// Release the loaded model. Idempotent.
    fn unload_model(&self);

    /// Embed one text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Whether `embed` can currently succeed.
    fn is_loaded(&self) -> bool;
}

impl TextEmbedding for EmbeddingService {
    fn load_model(&self, dir: &Path) -> Result<()> {
        EmbeddingService::load_model(self, dir)
    }

    fn unload_model(&self) {
        EmbeddingService::unload_model(self);
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        EmbeddingService::embed(self, text)
    }

    fn is_loaded(&self) -> bool {
        EmbeddingService::is_loaded(self)
    }
}

/// Create an unloaded embedder for `config.backend`.
///
/// Fails with [`EmbeddingError::Config`] when the backend was not compiled in.
pub fn create_embedding(config: &EmbeddingConfig) -> Result<Box<dyn TextEmbedding>> {
    match config.backend {
        InferenceBackend::OnnxRuntime => onnx_embedding(config),
    }
}

#[cfg(feature = "ort")]
fn onnx_embedding(config: &EmbeddingConfig) -> Result<Box<dyn TextEmbedding>> {
    Ok(Box::new(EmbeddingService::onnx(config.clone())))
}

#[cfg(not(feature = "ort"))]
fn onnx_embedding(config: &EmbeddingConfig) -> Result<Box<dyn TextEmbedding>> {
    Err(crate::errors::EmbeddingError::Config(format!(
        "backend {} requires the `ort` feature",
        config.backend.tag()
    )))
}
