//! ONNX Runtime backend (feature-gated behind `ort`).

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::engine::{EngineLoader, InferenceEngine};
use crate::errors::{EmbeddingError, Result, ResultExt};
use crate::tensor::{ATTENTION_MASK, INPUT_IDS, InputTensors, OutputTensor};

/// A committed ONNX session and its declared outputs.
///
/// The session sits behind a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxEngine {
    session: Mutex<Session>,
    output_names: Vec<String>,
}

impl OnnxEngine {
    fn from_session(session: Session) -> Result<Self> {
        let mut input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|input| input.name().to_string())
            .collect();
        input_names.sort();
        if input_names != [ATTENTION_MASK, INPUT_IDS] {
            return Err(EmbeddingError::ModelLoad(format!(
                "graph must declare exactly the inputs {INPUT_IDS} and {ATTENTION_MASK}, found {input_names:?}"
            )));
        }

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();
        debug!(outputs = ?output_names, "model outputs");

        Ok(Self {
            session: Mutex::new(session),
            output_names,
        })
    }
}

impl InferenceEngine for OnnxEngine {
    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn run(&self, output_names: &[&str], inputs: &InputTensors) -> Result<Vec<OutputTensor>> {
        let input_ids = Tensor::from_array((
            inputs.input_ids.shape_i64(),
            inputs.input_ids.data.clone(),
        ))
        .inference("input_ids tensor")?;
        let attention_mask = Tensor::from_array((
            inputs.attention_mask.shape_i64(),
            inputs.attention_mask.data.clone(),
        ))
        .inference("attention_mask tensor")?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![
                INPUT_IDS => input_ids,
                ATTENTION_MASK => attention_mask,
            ])
            .inference("session run")?;

        // Copy out before `outputs` (and the session borrow) is dropped.
        output_names
            .iter()
            .map(|&name| {
                let value = outputs.get(name).ok_or_else(|| {
                    EmbeddingError::Inference(format!("graph produced no output named {name}"))
                })?;
                let (shape, data) = value
                    .try_extract_tensor::<f32>()
                    .inference(&format!("extract {name}"))?;
                let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
                OutputTensor::new(name, dims, data.to_vec())
            })
            .collect()
    }
}

/// Loads `model.onnx` files into [`OnnxEngine`]s.
#[derive(Clone, Debug, Default)]
pub struct OnnxLoader {
    intra_threads: Option<usize>,
}

impl OnnxLoader {
    /// Create a loader. `None` leaves intra-op threading to ONNX Runtime.
    pub fn new(intra_threads: Option<usize>) -> Self {
        Self { intra_threads }
    }
}

impl EngineLoader for OnnxLoader {
    fn backend(&self) -> &'static str {
        "onnxruntime"
    }

    fn load(&self, model_path: &Path) -> Result<Box<dyn InferenceEngine>> {
        if !model_path.is_file() {
            return Err(EmbeddingError::ModelLoad(format!(
                "model file does not exist: {}",
                model_path.display()
            )));
        }

        let mut builder = Session::builder()
            .model_load("session builder")?
            .with_log_level(ort::logging::LogLevel::Warning)
            .model_load("log level")?;
        if let Some(threads) = self.intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .model_load("thread config")?;
        }
        let session = builder
            .commit_from_file(model_path)
            .model_load(&format!("commit {}", model_path.display()))?;

        let engine = OnnxEngine::from_session(session)?;
        info!(model = %model_path.display(), "ONNX model loaded");
        Ok(Box::new(engine))
    }
}
