//! Embedding configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Inference backend used to execute the model graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceBackend {
    /// ONNX Runtime via the `ort` crate (requires the `ort` feature).
    #[default]
    OnnxRuntime,
}

impl InferenceBackend {
    /// Parse a backend tag (case-insensitive).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "onnxruntime" | "onnx" | "ort" => Some(Self::OnnxRuntime),
            _ => None,
        }
    }

    /// Canonical tag, as written in config files.
    pub fn tag(self) -> &'static str {
        match self {
            Self::OnnxRuntime => "onnxruntime",
        }
    }
}

/// Candidate tokens that may mark the start of a sequence, in priority order.
pub const DEFAULT_BOS_CANDIDATES: &[&str] = &["[CLS]", "<s>"];

/// Candidate tokens that may mark the end of a sequence, in priority order.
pub const DEFAULT_EOS_CANDIDATES: &[&str] = &["[SEP]", "</s>"];

/// Configuration for the embedding service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingConfig {
    /// Graph execution backend.
    pub backend: InferenceBackend,
    /// Directory holding `tokenizer.json` and `model.onnx` (may contain `~`).
    pub model_dir: String,
    /// Intra-op thread count for the inference session. `None` lets the runtime decide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intra_threads: Option<usize>,
    /// Start-of-sequence tokens to look up in the vocabulary, first match wins.
    pub bos_candidates: Vec<String>,
    /// End-of-sequence tokens to look up in the vocabulary, first match wins.
    pub eos_candidates: Vec<String>,
    /// L2-normalize every returned vector.
    pub normalize: bool,
    /// Caller-side deadline for async embedding calls, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_timeout_ms: Option<u64>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: InferenceBackend::default(),
            model_dir: String::new(),
            intra_threads: None,
            bos_candidates: DEFAULT_BOS_CANDIDATES.iter().map(|s| (*s).to_string()).collect(),
            eos_candidates: DEFAULT_EOS_CANDIDATES.iter().map(|s| (*s).to_string()).collect(),
            normalize: false,
            embed_timeout_ms: None,
        }
    }
}

impl EmbeddingConfig {
    /// Config pointing at a model directory, everything else default.
    pub fn with_model_dir(model_dir: impl Into<String>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ..Self::default()
        }
    }

    /// Resolve the model directory, expanding `~/` to the home directory.
    pub fn resolved_model_dir(&self) -> PathBuf {
        if let Some(rest) = self.model_dir.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(&self.model_dir)
    }

    /// Async embedding deadline, if configured.
    pub fn embed_timeout(&self) -> Option<Duration> {
        self.embed_timeout_ms.map(Duration::from_millis)
    }
}
