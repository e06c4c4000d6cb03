//! Async adapter for blocking embedders.
//!
//! `embed` is CPU-bound, so it runs on tokio's blocking pool. A timeout bounds
//! the caller's wait only; the blocking call runs to completion regardless.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::backend::TextEmbedding;
use crate::errors::{EmbeddingError, Result};
use crate::service::EmbeddingService;

/// Embedding from async code without stalling the runtime.
#[async_trait]
pub trait AsyncTextEmbedding: Send + Sync {
    /// Embed `text` on the blocking pool.
    async fn embed_async(&self, text: &str) -> Result<Vec<f32>>;

    /// Like [`embed_async`](Self::embed_async), failing with
    /// [`EmbeddingError::Timeout`] once `timeout` elapses.
    async fn embed_with_timeout(&self, text: &str, timeout: Duration) -> Result<Vec<f32>> {
        match tokio::time::timeout(timeout, self.embed_async(text)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?timeout, "embedding timed out");
                Err(EmbeddingError::Timeout(timeout))
            }
        }
    }
}

#[async_trait]
impl<T: TextEmbedding + 'static> AsyncTextEmbedding for Arc<T> {
    async fn embed_async(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = Arc::clone(self);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| EmbeddingError::Internal(format!("join: {e}")))?
    }
}

impl EmbeddingService {
    /// Async embed bounded by the configured `embedTimeoutMs`, if any.
    pub async fn embed_configured(self: &Arc<Self>, text: &str) -> Result<Vec<f32>> {
        match self.config().embed_timeout() {
            Some(timeout) => self.embed_with_timeout(text, timeout).await,
            None => self.embed_async(text).await,
        }
    }
}
