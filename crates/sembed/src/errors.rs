//! Embedding error types.
//!
//! Load-time errors are returned to the caller and leave the process running.
//! Errors raised inside a single `embed` call are scoped to that call: the
//! shared tokenizer/model generation is untouched and later calls proceed.

use std::time::Duration;

use thiserror::Error;

/// Errors from embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Invalid or missing artifact paths, or an unusable backend selection.
    #[error("Config error: {0}")]
    Config(String),

    /// `tokenizer.json` missing, unreadable, or not a valid tokenizer.
    #[error("Tokenizer load failed: {0}")]
    TokenizerLoad(String),

    /// Inference graph missing, unloadable, or violating the input contract.
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    /// No tokenizer/model generation is loaded.
    #[error("Embedding model not loaded")]
    NotLoaded,

    /// The tokenizer produced no token ids for the input.
    #[error("Tokenizer returned no ids for input")]
    EmptyEncoding,

    /// A graph output cannot be turned into an embedding.
    #[error("Unexpected output shape: {0}")]
    UnexpectedOutputShape(String),

    /// The tokenizer rejected the input text.
    #[error("Tokenization failed: {0}")]
    Tokenize(String),

    /// Tensor construction, graph execution, or output extraction failed.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// A caller-side deadline elapsed before the embedding was ready.
    #[error("Embedding timed out after {0:?}")]
    Timeout(Duration),

    /// Generic internal error.
    #[error("{0}")]
    Internal(String),
}

/// How far the effect of an error reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorScope {
    /// Caused by this particular input; other calls are unaffected.
    Call,
    /// The service is between generations; retrying later may succeed.
    Transient,
    /// The loaded artifacts or configuration are unusable until repaired.
    Service,
}

impl EmbeddingError {
    /// Classify the error so callers can pick retry-the-call vs. abort-the-service.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::EmptyEncoding | Self::Tokenize(_) | Self::Inference(_) | Self::Timeout(_) => {
                ErrorScope::Call
            }
            Self::NotLoaded => ErrorScope::Transient,
            Self::Config(_)
            | Self::TokenizerLoad(_)
            | Self::ModelLoad(_)
            | Self::UnexpectedOutputShape(_)
            | Self::Internal(_) => ErrorScope::Service,
        }
    }

    /// Whether retrying the same call after a short wait may succeed.
    pub fn is_retryable(&self) -> bool {
        self.scope() == ErrorScope::Transient
    }
}

/// Result alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Extension trait to reduce `.map_err()` boilerplate when wrapping errors into `EmbeddingError`.
pub trait ResultExt<T> {
    /// Wrap the error as [`EmbeddingError::TokenizerLoad`] with `context` prefix.
    fn tokenizer_load(self, context: &str) -> Result<T>;
    /// Wrap the error as [`EmbeddingError::ModelLoad`] with `context` prefix.
    fn model_load(self, context: &str) -> Result<T>;
    /// Wrap the error as [`EmbeddingError::Inference`] with `context` prefix.
    fn inference(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn tokenizer_load(self, context: &str) -> Result<T> {
        self.map_err(|e| EmbeddingError::TokenizerLoad(format!("{context}: {e}")))
    }
    fn model_load(self, context: &str) -> Result<T> {
        self.map_err(|e| EmbeddingError::ModelLoad(format!("{context}: {e}")))
    }
    fn inference(self, context: &str) -> Result<T> {
        self.map_err(|e| EmbeddingError::Inference(format!("{context}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let cases = vec![
            (
                EmbeddingError::Config("model dir is empty".into()),
                "Config error: model dir is empty",
            ),
            (
                EmbeddingError::TokenizerLoad("no such file".into()),
                "Tokenizer load failed: no such file",
            ),
            (
                EmbeddingError::ModelLoad("bad graph".into()),
                "Model load failed: bad graph",
            ),
            (EmbeddingError::NotLoaded, "Embedding model not loaded"),
            (
                EmbeddingError::EmptyEncoding,
                "Tokenizer returned no ids for input",
            ),
            (
                EmbeddingError::UnexpectedOutputShape("[1, 4]".into()),
                "Unexpected output shape: [1, 4]",
            ),
            (
                EmbeddingError::Inference("run failed".into()),
                "Inference failed: run failed",
            ),
            (EmbeddingError::Internal("oops".into()), "oops"),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn timeout_display_includes_duration() {
        let err = EmbeddingError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Embedding timed out after 250ms");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EmbeddingError>();
    }

    #[test]
    fn scope_separates_input_from_service_errors() {
        assert_eq!(EmbeddingError::EmptyEncoding.scope(), ErrorScope::Call);
        assert_eq!(EmbeddingError::Tokenize("x".into()).scope(), ErrorScope::Call);
        assert_eq!(EmbeddingError::Inference("x".into()).scope(), ErrorScope::Call);
        assert_eq!(EmbeddingError::NotLoaded.scope(), ErrorScope::Transient);
        assert_eq!(
            EmbeddingError::TokenizerLoad("x".into()).scope(),
            ErrorScope::Service
        );
        assert_eq!(
            EmbeddingError::UnexpectedOutputShape("x".into()).scope(),
            ErrorScope::Service
        );
    }

    #[test]
    fn only_not_loaded_is_retryable() {
        assert!(EmbeddingError::NotLoaded.is_retryable());
        assert!(!EmbeddingError::EmptyEncoding.is_retryable());
        assert!(!EmbeddingError::ModelLoad("x".into()).is_retryable());
    }

    #[test]
    fn result_ext_tokenizer_load_context() {
        let err: std::result::Result<(), &str> = Err("missing vocab");
        let mapped = err.tokenizer_load("parse tokenizer.json");
        assert!(
            matches!(mapped, Err(EmbeddingError::TokenizerLoad(s)) if s == "parse tokenizer.json: missing vocab")
        );
    }

    #[test]
    fn result_ext_model_load_context() {
        let err: std::result::Result<(), &str> = Err("protobuf parse");
        let mapped = err.model_load("commit session");
        assert!(
            matches!(mapped, Err(EmbeddingError::ModelLoad(s)) if s == "commit session: protobuf parse")
        );
    }

    #[test]
    fn result_ext_inference_with_io_error() {
        let err: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "gone"));
        let mapped = err.inference("extract");
        assert!(matches!(mapped, Err(EmbeddingError::Inference(s)) if s.contains("gone")));
    }

    #[test]
    fn result_ext_ok_passthrough() {
        let ok: std::result::Result<i32, &str> = Ok(7);
        assert_eq!(ok.inference("ctx").unwrap(), 7);
    }
}
