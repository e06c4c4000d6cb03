//! # sembed
//!
//! Sentence embeddings from transformer graphs exported to ONNX.
//!
//! - Tokenize with `tokenizers`, wrapping the ids in resolved BOS/EOS tokens
//! - Run the graph through a pluggable [`InferenceEngine`] (`ort` behind the `ort` feature)
//! - Return a pooled sentence output verbatim, or mean-pool `last_hidden_state`
//!
//! [`EmbeddingService`] holds the tokenizer and graph as one generation behind a
//! reader-writer lock: `embed` runs concurrently from any number of threads while
//! `load_model`/`unload_model` swap the pair atomically.
//!
//! ## Crate Position
//!
//! Standalone library. No logging subscriber is installed here.

#![deny(unsafe_code)]

pub mod async_embed;
pub mod backend;
pub mod config;
pub mod engine;
pub mod errors;
pub mod loader;
pub mod model;
pub mod normalize;
#[cfg(feature = "ort")]
pub mod onnx;
pub mod selector;
pub mod service;
pub mod tensor;
pub mod testing;
pub mod tokenizer;

pub use async_embed::AsyncTextEmbedding;
pub use backend::{TextEmbedding, create_embedding};
pub use config::{EmbeddingConfig, InferenceBackend};
pub use engine::{EngineLoader, InferenceEngine};
pub use errors::{EmbeddingError, ErrorScope, Result};
pub use loader::load_config_from_path;
pub use model::ModelFiles;
pub use normalize::{cosine_similarity, l2_norm, l2_normalize};
#[cfg(feature = "ort")]
pub use onnx::{OnnxEngine, OnnxLoader};
pub use selector::{OutputSelection, mean_pool};
pub use service::{EmbeddingService, LifecycleState};
pub use tensor::{EncodedInput, InputTensors, OutputTensor};
pub use tokenizer::{SpecialTokens, TokenizerAdapter, Vocabulary};
