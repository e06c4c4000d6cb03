//! Input/output tensor containers shared by every inference backend.
//!
//! The graph contract is fixed: two `i64` inputs named [`INPUT_IDS`] and
//! [`ATTENTION_MASK`], both shaped `[1, sequence_length]`.

use crate::errors::{EmbeddingError, Result};

/// Name of the token id input.
pub const INPUT_IDS: &str = "input_ids";

/// Name of the attention mask input.
pub const ATTENTION_MASK: &str = "attention_mask";

/// Token ids with their parallel attention mask for one text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedInput {
    /// Token ids, boundary tokens included.
    pub input_ids: Vec<i64>,
    /// 1 for real positions, 0 for padding. Same length as `input_ids`.
    pub attention_mask: Vec<i64>,
}

impl EncodedInput {
    /// Pair `ids` with an all-ones mask (single text, no padding).
    pub fn unpadded(input_ids: Vec<i64>) -> Self {
        let attention_mask = vec![1i64; input_ids.len()];
        Self {
            input_ids,
            attention_mask,
        }
    }

    /// Sequence length.
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Whether the sequence has no tokens.
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// One named `[1, sequence_length]` integer tensor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputTensor {
    /// Graph input name.
    pub name: &'static str,
    /// Tensor shape, always `[1, sequence_length]`.
    pub shape: [usize; 2],
    /// Row-major values.
    pub data: Vec<i64>,
}

impl InputTensor {
    /// Shape as the signed dimensions graph runtimes expect.
    pub fn shape_i64(&self) -> Vec<i64> {
        self.shape.iter().map(|&d| d as i64).collect()
    }
}

/// The two inputs a forward pass needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputTensors {
    /// Token ids tensor.
    pub input_ids: InputTensor,
    /// Attention mask tensor.
    pub attention_mask: InputTensor,
}

impl InputTensors {
    /// Build both tensors from an encoded input.
    ///
    /// Fails if the mask and ids disagree in length or the sequence is empty.
    pub fn build(input: EncodedInput) -> Result<Self> {
        if input.is_empty() {
            return Err(EmbeddingError::EmptyEncoding);
        }
        if input.attention_mask.len() != input.input_ids.len() {
            return Err(EmbeddingError::Inference(format!(
                "attention mask length {} != input ids length {}",
                input.attention_mask.len(),
                input.input_ids.len()
            )));
        }
        let shape = [1, input.input_ids.len()];
        Ok(Self {
            input_ids: InputTensor {
                name: INPUT_IDS,
                shape,
                data: input.input_ids,
            },
            attention_mask: InputTensor {
                name: ATTENTION_MASK,
                shape,
                data: input.attention_mask,
            },
        })
    }

    /// Sequence length shared by both tensors.
    pub fn sequence_length(&self) -> usize {
        self.input_ids.shape[1]
    }

    /// The attention mask values.
    pub fn mask(&self) -> &[i64] {
        &self.attention_mask.data
    }
}

/// A float tensor produced by the graph, copied out of the runtime.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputTensor {
    /// Graph output name.
    pub name: String,
    /// Dimensions, outermost first.
    pub shape: Vec<usize>,
    /// Row-major values.
    pub data: Vec<f32>,
}

impl OutputTensor {
    /// Create an output tensor, checking that `data` fills `shape` exactly.
    pub fn new(name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let name = name.into();
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(EmbeddingError::UnexpectedOutputShape(format!(
                "{name}: shape {shape:?} holds {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { name, shape, data })
    }

    /// Row-major contents, consuming the tensor.
    pub fn into_flat(self) -> Vec<f32> {
        self.data
    }
}
