//! Output selection and mean pooling.
//!
//! Exported embedding graphs disagree on what they return. Some expose an
//! already-pooled sentence vector, others only token-level hidden states.
//! The choice is made from declared output names alone:
//!
//! 1. first name containing `sentence` or `embedding` is returned verbatim;
//! 2. otherwise the first name that is not `last_hidden_state` is returned verbatim;
//! 3. otherwise `last_hidden_state` is mean-pooled over the attention mask.

use ndarray::{Array1, ArrayView3, Axis};

use crate::errors::{EmbeddingError, Result};
use crate::tensor::OutputTensor;

/// Token-level hidden state output name.
pub const LAST_HIDDEN_STATE: &str = "last_hidden_state";

/// Which output to request and how to turn it into a vector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputSelection {
    /// Return the named output flattened, as-is.
    Verbatim(String),
    /// Mean-pool [`LAST_HIDDEN_STATE`] over masked-in positions.
    MeanPool,
}

impl OutputSelection {
    /// Choose from the graph's declared output names, in declaration order.
    pub fn from_declared<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Err(EmbeddingError::UnexpectedOutputShape(
                "model declares no outputs".into(),
            ));
        }
        if let Some(name) = names
            .iter()
            .map(AsRef::as_ref)
            .find(|n| n.contains("sentence") || n.contains("embedding"))
        {
            return Ok(Self::Verbatim(name.to_string()));
        }
        if let Some(name) = names
            .iter()
            .map(AsRef::as_ref)
            .find(|n| *n != LAST_HIDDEN_STATE)
        {
            return Ok(Self::Verbatim(name.to_string()));
        }
        Ok(Self::MeanPool)
    }

    /// Output name to request from the graph.
    pub fn output_name(&self) -> &str {
        match self {
            Self::Verbatim(name) => name,
            Self::MeanPool => LAST_HIDDEN_STATE,
        }
    }

    /// Turn the requested output into an embedding vector.
    pub fn apply(&self, output: OutputTensor, attention_mask: &[i64]) -> Result<Vec<f32>> {
        match self {
            Self::Verbatim(_) => Ok(output.into_flat()),
            Self::MeanPool => mean_pool(&output, attention_mask),
        }
    }
}

/// Average the hidden vectors of `[1, seq_len, hidden]` at positions where the mask is 1.
///
/// With no masked-in position the sum is divided by 1, giving a zero vector.
pub fn mean_pool(output: &OutputTensor, attention_mask: &[i64]) -> Result<Vec<f32>> {
    let &[batch, seq_len, hidden] = output.shape.as_slice() else {
        return Err(EmbeddingError::UnexpectedOutputShape(format!(
            "{}: expected rank 3, got {:?}",
            output.name, output.shape
        )));
    };
    if batch != 1 {
        return Err(EmbeddingError::UnexpectedOutputShape(format!(
            "{}: expected batch size 1, got {:?}",
            output.name, output.shape
        )));
    }
    if seq_len != attention_mask.len() {
        return Err(EmbeddingError::UnexpectedOutputShape(format!(
            "{}: sequence length {seq_len} != attention mask length {}",
            output.name,
            attention_mask.len()
        )));
    }

    let states = ArrayView3::from_shape((batch, seq_len, hidden), &output.data).map_err(|e| {
        EmbeddingError::UnexpectedOutputShape(format!("{}: {e}", output.name))
    })?;

    let mut pooled = Array1::<f32>::zeros(hidden);
    let mut valid = 0usize;
    for (row, _) in states
        .index_axis(Axis(0), 0)
        .outer_iter()
        .zip(attention_mask)
        .filter(|(_, m)| **m == 1)
    {
        pooled += &row;
        valid += 1;
    }

    pooled /= valid.max(1) as f32;
    Ok(pooled.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden(seq: usize, dim: usize, rows: &[f32]) -> OutputTensor {
        OutputTensor::new(LAST_HIDDEN_STATE, vec![1, seq, dim], rows.to_vec()).unwrap()
    }

    #[test]
    fn sentence_output_wins_over_hidden_state() {
        let sel = OutputSelection::from_declared(&["last_hidden_state", "sentence_embedding"]).unwrap();
        assert_eq!(sel, OutputSelection::Verbatim("sentence_embedding".into()));
        assert_eq!(sel.output_name(), "sentence_embedding");
    }

    #[test]
    fn first_keyword_match_in_declaration_order() {
        let sel =
            OutputSelection::from_declared(&["token_embeddings", "sentence_embedding"]).unwrap();
        assert_eq!(sel, OutputSelection::Verbatim("token_embeddings".into()));
    }

    #[test]
    fn non_default_output_used_verbatim() {
        let sel = OutputSelection::from_declared(&["last_hidden_state", "pooler_output"]).unwrap();
        assert_eq!(sel, OutputSelection::Verbatim("pooler_output".into()));
    }

    #[test]
    fn keyword_beats_earlier_non_default() {
        let sel = OutputSelection::from_declared(&["pooler_output", "dense_embedding"]).unwrap();
        assert_eq!(sel, OutputSelection::Verbatim("dense_embedding".into()));
    }

    #[test]
    fn only_hidden_state_means_pooling() {
        let sel = OutputSelection::from_declared(&["last_hidden_state"]).unwrap();
        assert_eq!(sel, OutputSelection::MeanPool);
        assert_eq!(sel.output_name(), "last_hidden_state");
    }

    #[test]
    fn no_outputs_is_an_error() {
        let names: [&str; 0] = [];
        assert!(matches!(
            OutputSelection::from_declared(&names),
            Err(EmbeddingError::UnexpectedOutputShape(_))
        ));
    }

    #[test]
    fn verbatim_apply_never_pools() {
        let sel = OutputSelection::Verbatim("sentence_embedding".into());
        // Rank-2 output would be rejected by pooling; verbatim returns it untouched.
        let out = OutputTensor::new("sentence_embedding", vec![1, 3], vec![0.5, -1.0, 2.0]).unwrap();
        assert_eq!(sel.apply(out, &[1, 1, 1, 1, 1]).unwrap(), vec![0.5, -1.0, 2.0]);
    }

    #[test]
    fn mean_pool_excludes_masked_positions() {
        let out = hidden(3, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        assert_eq!(mean_pool(&out, &[1, 1, 0]).unwrap(), vec![1.5, 1.5]);
    }

    #[test]
    fn mean_pool_all_ones_is_plain_average() {
        let out = hidden(2, 3, &[1.0, 2.0, 3.0, 3.0, 4.0, 5.0]);
        assert_eq!(mean_pool(&out, &[1, 1]).unwrap(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn mean_pool_all_masked_yields_zero_vector() {
        let out = hidden(4, 2, &[0.0; 8]);
        let pooled = mean_pool(&out, &[0, 0, 0, 0]).unwrap();
        assert_eq!(pooled, vec![0.0, 0.0]);

        let out = hidden(2, 2, &[5.0, -5.0, 7.0, 1.0]);
        let pooled = mean_pool(&out, &[0, 0]).unwrap();
        assert!(pooled.iter().all(|v| v.is_finite()));
        assert_eq!(pooled, vec![0.0, 0.0]);
    }

    #[test]
    fn mean_pool_rejects_wrong_rank() {
        let out = OutputTensor::new(LAST_HIDDEN_STATE, vec![1, 4], vec![0.0; 4]).unwrap();
        let err = mean_pool(&out, &[1, 1, 1, 1]).unwrap_err();
        assert!(matches!(err, EmbeddingError::UnexpectedOutputShape(msg) if msg.contains("rank 3")));
    }

    #[test]
    fn mean_pool_rejects_batch_above_one() {
        let out = OutputTensor::new(LAST_HIDDEN_STATE, vec![2, 1, 2], vec![0.0; 4]).unwrap();
        assert!(matches!(
            mean_pool(&out, &[1]),
            Err(EmbeddingError::UnexpectedOutputShape(_))
        ));
    }

    #[test]
    fn mean_pool_rejects_mask_length_mismatch() {
        let out = hidden(3, 2, &[0.0; 6]);
        assert!(matches!(
            mean_pool(&out, &[1, 1]),
            Err(EmbeddingError::UnexpectedOutputShape(_))
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn pooled_length_is_hidden_size(
                seq in 1usize..16,
                dim in 1usize..32,
                seed in -10.0f32..10.0,
            ) {
                let data: Vec<f32> = (0..seq * dim).map(|i| seed + i as f32 * 0.01).collect();
                let out = OutputTensor::new(LAST_HIDDEN_STATE, vec![1, seq, dim], data).unwrap();
                let pooled = mean_pool(&out, &vec![1; seq]).unwrap();
                prop_assert_eq!(pooled.len(), dim);
            }

            #[test]
            fn pooled_values_within_row_bounds(
                rows in proptest::collection::vec(-100.0f32..100.0, 2..40),
            ) {
                // Single hidden unit: pooled value lies between min and max of the rows.
                let seq = rows.len();
                let out = OutputTensor::new(LAST_HIDDEN_STATE, vec![1, seq, 1], rows.clone()).unwrap();
                let pooled = mean_pool(&out, &vec![1; seq]).unwrap()[0];
                let lo = rows.iter().copied().fold(f32::INFINITY, f32::min);
                let hi = rows.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                prop_assert!(pooled >= lo - 1e-3 && pooled <= hi + 1e-3);
            }

            #[test]
            fn masked_rows_do_not_contribute(
                kept in proptest::collection::vec(-10.0f32..10.0, 1..8),
                noise in -1000.0f32..1000.0,
            ) {
                let mut data = kept.clone();
                data.push(noise);
                let seq = data.len();
                let mut mask = vec![1i64; seq];
                mask[seq - 1] = 0;
                let with_noise = OutputTensor::new(LAST_HIDDEN_STATE, vec![1, seq, 1], data).unwrap();
                let without = OutputTensor::new(LAST_HIDDEN_STATE, vec![1, seq - 1, 1], kept).unwrap();
                let a = mean_pool(&with_noise, &mask).unwrap();
                let b = mean_pool(&without, &vec![1; seq - 1]).unwrap();
                prop_assert!((a[0] - b[0]).abs() < 1e-4);
            }
        }
    }
}
