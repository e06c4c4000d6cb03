//! Embedding service: one tokenizer/model generation behind one lock.
//!
//! `embed` takes shared access to the generation, so any number of calls run
//! at once on their callers' threads. `load_model` and `unload_model` take
//! exclusive access and swap the tokenizer and model together; no call can see
//! a tokenizer from one load paired with a model from another.

use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::EmbeddingConfig;
use crate::engine::{EngineLoader, InferenceEngine};
use crate::errors::{EmbeddingError, Result};
use crate::model::ModelFiles;
use crate::normalize::l2_normalize;
use crate::selector::OutputSelection;
use crate::tensor::InputTensors;
use crate::tokenizer::{SpecialTokens, TokenizerAdapter};

/// Lifecycle phase of an [`EmbeddingService`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    /// No usable generation. A tokenizer may still be held after a failed model load.
    Unloaded = 0,
    /// `load_model` is in progress.
    Loading = 1,
    /// Tokenizer and model are both loaded.
    Loaded = 2,
    /// `unload_model` is in progress.
    Unloading = 3,
}

impl LifecycleState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Loading,
            2 => Self::Loaded,
            3 => Self::Unloading,
            _ => Self::Unloaded,
        }
    }
}

/// Tokenizer and model from one load.
#[derive(Default)]
struct Generation {
    tokenizer: Option<TokenizerAdapter>,
    engine: Option<Box<dyn InferenceEngine>>,
    /// Vector length returned by the first successful call.
    dimensions: OnceLock<usize>,
}

impl Generation {
    fn is_empty(&self) -> bool {
        self.tokenizer.is_none() && self.engine.is_none()
    }

    fn is_loaded(&self) -> bool {
        self.tokenizer.is_some() && self.engine.is_some()
    }
}

/// Sentence embedding service over one loadable model directory.
pub struct EmbeddingService {
    config: EmbeddingConfig,
    loader: Box<dyn EngineLoader>,
    generation: RwLock<Generation>,
    phase: AtomicU8,
}

impl EmbeddingService {
    /// Create an unloaded service that builds engines with `loader`.
    pub fn new(config: EmbeddingConfig, loader: impl EngineLoader + 'static) -> Self {
        Self {
            config,
            loader: Box::new(loader),
            generation: RwLock::new(Generation::default()),
            phase: AtomicU8::new(LifecycleState::Unloaded as u8),
        }
    }

    /// Create an unloaded service backed by ONNX Runtime.
    #[cfg(feature = "ort")]
    pub fn onnx(config: EmbeddingConfig) -> Self {
        let loader = crate::onnx::OnnxLoader::new(config.intra_threads);
        Self::new(config, loader)
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.phase.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: LifecycleState) {
        self.phase.store(state as u8, Ordering::SeqCst);
    }

    /// Whether both tokenizer and model are loaded.
    pub fn is_loaded(&self) -> bool {
        self.generation.read().is_loaded()
    }

    /// Whether a tokenizer is held, including after a failed model load.
    pub fn is_tokenizer_loaded(&self) -> bool {
        self.generation.read().tokenizer.is_some()
    }

    /// Boundary tokens of the loaded tokenizer.
    pub fn special_tokens(&self) -> Option<SpecialTokens> {
        self.generation
            .read()
            .tokenizer
            .as_ref()
            .map(TokenizerAdapter::special_tokens)
    }

    /// Embedding length seen for the current generation, once one call succeeded.
    pub fn dimensions(&self) -> Option<usize> {
        self.generation.read().dimensions.get().copied()
    }

    /// Load `tokenizer.json` then `model.onnx` from `dir`, replacing any loaded generation.
    ///
    /// A path that is empty or not a directory fails before anything is released.
    /// If the tokenizer fails nothing is held afterwards. If the model fails the
    /// new tokenizer stays loaded and the service remains [`LifecycleState::Unloaded`].
    pub fn load_model(&self, dir: &Path) -> Result<()> {
        let files = ModelFiles::locate(dir)?;

        let mut generation = self.generation.write();
        self.set_state(LifecycleState::Loading);
        *generation = Generation::default();

        let result = self.load_generation(&mut generation, &files);
        self.set_state(if generation.is_loaded() {
            LifecycleState::Loaded
        } else {
            LifecycleState::Unloaded
        });
        result
    }

    fn load_generation(&self, generation: &mut Generation, files: &ModelFiles) -> Result<()> {
        let tokenizer = TokenizerAdapter::load(
            &files.tokenizer,
            &self.config.bos_candidates,
            &self.config.eos_candidates,
        )?;
        generation.tokenizer = Some(tokenizer);

        match self.loader.load(&files.model) {
            Ok(engine) => {
                info!(
                    backend = self.loader.backend(),
                    model = %files.model.display(),
                    outputs = ?engine.output_names(),
                    "embedding model loaded"
                );
                generation.engine = Some(engine);
                Ok(())
            }
            Err(e) => {
                warn!(
                    backend = self.loader.backend(),
                    model = %files.model.display(),
                    error = %e,
                    "model load failed, tokenizer stays loaded"
                );
                Err(e)
            }
        }
    }

    /// Load from the configured `model_dir`.
    pub fn load_configured_model(&self) -> Result<()> {
        let dir = self.config.resolved_model_dir();
        self.load_model(&dir)
    }

    /// Release tokenizer and model together. Calling it again is a no-op.
    pub fn unload_model(&self) {
        let mut generation = self.generation.write();
        if generation.is_empty() {
            return;
        }
        self.set_state(LifecycleState::Unloading);
        *generation = Generation::default();
        self.set_state(LifecycleState::Unloaded);
        info!("embedding model unloaded");
    }

    /// Unload, then load from `dir`.
    ///
    /// Not atomic: concurrent `embed` calls in between get [`EmbeddingError::NotLoaded`].
    pub fn reload_model(&self, dir: &Path) -> Result<()> {
        self.unload_model();
        self.load_model(dir)
    }

    /// Embed one text into a sentence vector.
    ///
    /// Blocks the calling thread for tokenization and graph execution.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let generation = self.generation.read();
        let (Some(tokenizer), Some(engine)) = (&generation.tokenizer, &generation.engine) else {
            return Err(EmbeddingError::NotLoaded);
        };

        let tensors = InputTensors::build(tokenizer.build_input(text)?)?;
        let selection = OutputSelection::from_declared(engine.output_names())?;
        debug!(
            output = selection.output_name(),
            tokens = tensors.sequence_length(),
            pooled = matches!(selection, OutputSelection::MeanPool),
            "running inference"
        );

        let output = engine
            .run(&[selection.output_name()], &tensors)?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Inference("graph returned no outputs".into()))?;
        let mut vector = selection.apply(output, tensors.mask())?;

        let expected = *generation.dimensions.get_or_init(|| vector.len());
        if expected != vector.len() {
            warn!(
                expected,
                got = vector.len(),
                output = selection.output_name(),
                "embedding length changed within one model generation"
            );
        }

        if self.config.normalize {
            l2_normalize(&mut vector);
        }
        Ok(vector)
    }
}
