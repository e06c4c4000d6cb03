//! Deterministic stand-ins for the tokenizer and inference graph.
//!
//! Used by this crate's tests and by downstream crates that need an embedder
//! without ONNX Runtime. Outputs depend only on the token ids, so identical
//! inputs always produce identical vectors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::engine::{EngineLoader, InferenceEngine, take_requested};
use crate::errors::{EmbeddingError, Result};
use crate::model::ModelFiles;
use crate::selector::LAST_HIDDEN_STATE;
use crate::tensor::{InputTensors, OutputTensor};
use crate::tokenizer::Vocabulary;

/// Whitespace vocabulary where a token's id is its position in the list.
///
/// Unknown words map to `[UNK]` when the list has it, otherwise encoding fails.
#[derive(Clone, Debug)]
pub struct StubVocabulary {
    ids: HashMap<String, u32>,
}

impl StubVocabulary {
    /// Build from tokens in id order.
    pub fn new(tokens: &[&str]) -> Self {
        let ids = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| ((*t).to_string(), i as u32))
            .collect();
        Self { ids }
    }
}

impl Vocabulary for StubVocabulary {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        text.split_whitespace()
            .map(|word| {
                self.ids
                    .get(word)
                    .or_else(|| self.ids.get("[UNK]"))
                    .copied()
                    .ok_or_else(|| EmbeddingError::Tokenize(format!("unknown word {word:?}")))
            })
            .collect()
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }
}

/// Hash-derived pooled vector for `ids`, values in `[-1, 1]`.
pub fn stub_sentence_vector(ids: &[i64], dims: usize) -> Vec<f32> {
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.to_le_bytes());
    }
    let hash = hasher.finalize();
    (0..dims)
        .map(|i| (f32::from(hash[i % hash.len()]) / 127.5) - 1.0)
        .collect()
}

/// Token-level hidden states `[1, seq, hidden]` where row `i` is `ids[i] + 0.25 * j`.
pub fn stub_hidden_state(ids: &[i64], hidden: usize) -> Vec<f32> {
    ids.iter()
        .flat_map(|&id| (0..hidden).map(move |j| id as f32 + 0.25 * j as f32))
        .collect()
}

/// Graph stand-in that answers from the input ids alone.
#[derive(Clone, Debug)]
pub struct StubEngine {
    output_names: Vec<String>,
    hidden: usize,
}

impl StubEngine {
    /// Engine declaring `outputs` with hidden size `hidden`.
    pub fn new(outputs: &[&str], hidden: usize) -> Self {
        Self {
            output_names: outputs.iter().map(|s| (*s).to_string()).collect(),
            hidden,
        }
    }
}

impl InferenceEngine for StubEngine {
    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn run(&self, output_names: &[&str], inputs: &InputTensors) -> Result<Vec<OutputTensor>> {
        let ids = &inputs.input_ids.data;
        let produced = self
            .output_names
            .iter()
            .map(|name| {
                if name == LAST_HIDDEN_STATE {
                    OutputTensor::new(
                        name.clone(),
                        vec![1, ids.len(), self.hidden],
                        stub_hidden_state(ids, self.hidden),
                    )
                } else {
                    OutputTensor::new(
                        name.clone(),
                        vec![1, self.hidden],
                        stub_sentence_vector(ids, self.hidden),
                    )
                }
            })
            .collect::<Result<Vec<_>>>()?;
        take_requested(output_names, produced)
    }
}

/// Loader producing [`StubEngine`]s, or failing on demand.
#[derive(Clone, Debug)]
pub struct StubLoader {
    engine: Option<StubEngine>,
}

impl StubLoader {
    /// Loader whose engines declare `outputs` with hidden size `hidden`.
    pub fn new(outputs: &[&str], hidden: usize) -> Self {
        Self {
            engine: Some(StubEngine::new(outputs, hidden)),
        }
    }

    /// Loader that always fails with [`EmbeddingError::ModelLoad`].
    pub fn failing() -> Self {
        Self { engine: None }
    }
}

impl EngineLoader for StubLoader {
    fn backend(&self) -> &'static str {
        "stub"
    }

    fn load(&self, model_path: &Path) -> Result<Box<dyn InferenceEngine>> {
        if !model_path.is_file() {
            return Err(EmbeddingError::ModelLoad(format!(
                "model file does not exist: {}",
                model_path.display()
            )));
        }
        match &self.engine {
            Some(engine) => Ok(Box::new(engine.clone())),
            None => Err(EmbeddingError::ModelLoad(format!(
                "stub loader rejects {}",
                model_path.display()
            ))),
        }
    }
}

/// Write a whitespace word-level `tokenizer.json` into `dir`; ids follow `vocab` order.
///
/// Include `"[UNK]"` in `vocab` so unknown words encode instead of failing.
pub fn write_word_level_tokenizer(dir: &Path, vocab: &[&str]) -> std::io::Result<PathBuf> {
    let ids: Map<String, Value> = vocab
        .iter()
        .enumerate()
        .map(|(i, t)| ((*t).to_string(), json!(i)))
        .collect();
    let tokenizer = json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": ids,
            "unk_token": "[UNK]"
        }
    });
    let path = dir.join(ModelFiles::TOKENIZER);
    std::fs::write(&path, tokenizer.to_string())?;
    Ok(path)
}

/// Lay out a model directory the [`StubLoader`] accepts: a word-level tokenizer
/// plus an empty `model.onnx`.
pub fn write_stub_model_dir(dir: &Path, vocab: &[&str]) -> std::io::Result<ModelFiles> {
    let _ = write_word_level_tokenizer(dir, vocab)?;
    std::fs::write(dir.join(ModelFiles::MODEL), b"")?;
    Ok(ModelFiles::from_dir(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::EncodedInput;

    #[test]
    fn stub_vocabulary_maps_unknown_to_unk() {
        let vocab = StubVocabulary::new(&["[UNK]", "hello"]);
        assert_eq!(vocab.encode("hello there").unwrap(), vec![1, 0]);
        assert_eq!(vocab.token_to_id("hello"), Some(1));
        assert_eq!(vocab.token_to_id("there"), None);
    }

    #[test]
    fn stub_vocabulary_without_unk_rejects_unknown() {
        let vocab = StubVocabulary::new(&["hello"]);
        assert!(matches!(vocab.encode("bye"), Err(EmbeddingError::Tokenize(_))));
    }

    #[test]
    fn sentence_vector_deterministic_and_input_sensitive() {
        assert_eq!(stub_sentence_vector(&[1, 2, 3], 16), stub_sentence_vector(&[1, 2, 3], 16));
        assert_ne!(stub_sentence_vector(&[1, 2, 3], 16), stub_sentence_vector(&[3, 2, 1], 16));
        assert!(stub_sentence_vector(&[9], 64).iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn engine_shapes_outputs() {
        let engine = StubEngine::new(&["last_hidden_state", "sentence_embedding"], 3);
        let inputs = InputTensors::build(EncodedInput::unpadded(vec![4, 5])).unwrap();
        let out = engine
            .run(&["sentence_embedding", "last_hidden_state"], &inputs)
            .unwrap();
        assert_eq!(out[0].shape, vec![1, 3]);
        assert_eq!(out[1].shape, vec![1, 2, 3]);
        assert_eq!(out[1].data, vec![4.0, 4.25, 4.5, 5.0, 5.25, 5.5]);
    }

    #[test]
    fn engine_rejects_undeclared_output() {
        let engine = StubEngine::new(&["last_hidden_state"], 3);
        let inputs = InputTensors::build(EncodedInput::unpadded(vec![1])).unwrap();
        assert!(engine.run(&["pooler_output"], &inputs).is_err());
    }

    #[test]
    fn stub_model_dir_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let files = write_stub_model_dir(tmp.path(), &["[UNK]"]).unwrap();
        assert!(files.all_exist());
        assert!(StubLoader::new(&["x"], 1).load(&files.model).is_ok());
        assert!(StubLoader::failing().load(&files.model).is_err());
    }
}
