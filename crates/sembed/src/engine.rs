//! Inference engine abstraction.
//!
//! An engine owns one compiled graph. Loaders turn a model file into an
//! engine; dropping the engine releases the graph.

use std::path::Path;

use crate::errors::{EmbeddingError, Result};
use crate::tensor::{InputTensors, OutputTensor};

/// A loaded inference graph that can run forward passes.
///
/// Implementations must allow concurrent `run` calls from many threads.
pub trait InferenceEngine: Send + Sync {
    /// Output names declared by the graph, in declaration order.
    fn output_names(&self) -> &[String];

    /// Run a forward pass and return the requested outputs in the requested order.
    fn run(&self, output_names: &[&str], inputs: &InputTensors) -> Result<Vec<OutputTensor>>;
}

/// Creates engines from model files for one backend.
pub trait EngineLoader: Send + Sync {
    /// Backend tag, for logs.
    fn backend(&self) -> &'static str;

    /// Load the graph at `model_path`.
    fn load(&self, model_path: &Path) -> Result<Box<dyn InferenceEngine>>;
}

/// Reorder `produced` to match `requested`, failing if any requested name is absent.
pub fn take_requested(requested: &[&str], mut produced: Vec<OutputTensor>) -> Result<Vec<OutputTensor>> {
    requested
        .iter()
        .map(|name| {
            let idx = produced
                .iter()
                .position(|t| t.name == *name)
                .ok_or_else(|| EmbeddingError::Inference(format!("graph produced no output named {name}")))?;
            Ok(produced.swap_remove(idx))
        })
        .collect()
}
