//! Tokenization with special boundary-token resolution.
//!
//! The vocabulary itself is an external collaborator behind [`Vocabulary`];
//! `tokenizers::Tokenizer` is the production implementation. Boundary tokens
//! are resolved once at load time and added by [`TokenizerAdapter::build_input`],
//! never by the tokenizer's own post-processor.

use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::{EmbeddingError, Result, ResultExt};
use crate::tensor::EncodedInput;

/// Minimal view of a tokenizer: text to ids, and token lookup.
pub trait Vocabulary: Send + Sync {
    /// Encode `text` into token ids without adding special tokens.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Id of `token` if it is in the vocabulary.
    fn token_to_id(&self, token: &str) -> Option<u32>;
}

impl Vocabulary for tokenizers::Tokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = (**self)
            .encode(text, false)
            .map_err(|e| EmbeddingError::Tokenize(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        (**self).token_to_id(token)
    }
}

/// Resolved boundary tokens. Either side may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpecialTokens {
    /// Start-of-sequence id, prepended when present.
    pub bos: Option<u32>,
    /// End-of-sequence id, appended when present.
    pub eos: Option<u32>,
}

impl SpecialTokens {
    /// Look up each candidate list in order; the first token in the vocabulary wins.
    pub fn resolve<S: AsRef<str>>(
        vocab: &dyn Vocabulary,
        bos_candidates: &[S],
        eos_candidates: &[S],
    ) -> Self {
        Self {
            bos: first_present(vocab, bos_candidates),
            eos: first_present(vocab, eos_candidates),
        }
    }
}

fn first_present<S: AsRef<str>>(vocab: &dyn Vocabulary, candidates: &[S]) -> Option<u32> {
    candidates
        .iter()
        .find_map(|token| vocab.token_to_id(token.as_ref()))
}

/// Tokenizer plus the boundary tokens resolved for it.
pub struct TokenizerAdapter {
    vocab: Box<dyn Vocabulary>,
    specials: SpecialTokens,
}

impl fmt::Debug for TokenizerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenizerAdapter")
            .field("specials", &self.specials)
            .finish_non_exhaustive()
    }
}

impl TokenizerAdapter {
    /// Load `tokenizer.json` from `path` and resolve boundary tokens.
    pub fn load<S: AsRef<str>>(
        path: &Path,
        bos_candidates: &[S],
        eos_candidates: &[S],
    ) -> Result<Self> {
        if !path.is_file() {
            return Err(EmbeddingError::TokenizerLoad(format!(
                "tokenizer file does not exist: {}",
                path.display()
            )));
        }
        debug!(path = %path.display(), "loading tokenizer");
        let tokenizer = tokenizers::Tokenizer::from_file(path)
            .tokenizer_load(&format!("parse {}", path.display()))?;
        let adapter = Self::from_vocabulary(Box::new(tokenizer), bos_candidates, eos_candidates);
        info!(
            path = %path.display(),
            bos = ?adapter.specials.bos,
            eos = ?adapter.specials.eos,
            "tokenizer loaded"
        );
        Ok(adapter)
    }

    /// Wrap an already-constructed vocabulary.
    pub fn from_vocabulary<S: AsRef<str>>(
        vocab: Box<dyn Vocabulary>,
        bos_candidates: &[S],
        eos_candidates: &[S],
    ) -> Self {
        let specials = SpecialTokens::resolve(vocab.as_ref(), bos_candidates, eos_candidates);
        Self { vocab, specials }
    }

    /// Boundary tokens resolved at load time.
    pub fn special_tokens(&self) -> SpecialTokens {
        self.specials
    }

    /// Encode `text` into token ids. Never returns an empty sequence.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let ids = self.vocab.encode(text)?;
        if ids.is_empty() {
            return Err(EmbeddingError::EmptyEncoding);
        }
        Ok(ids)
    }

    /// Encode `text` and wrap it in the resolved boundary tokens.
    ///
    /// No truncation or padding is applied; the mask is all ones.
    pub fn build_input(&self, text: &str) -> Result<EncodedInput> {
        let ids = self.encode(text)?;
        let mut input_ids = Vec::with_capacity(ids.len() + 2);
        if let Some(bos) = self.specials.bos {
            input_ids.push(i64::from(bos));
        }
        input_ids.extend(ids.into_iter().map(i64::from));
        if let Some(eos) = self.specials.eos {
            input_ids.push(i64::from(eos));
        }
        Ok(EncodedInput::unpadded(input_ids))
    }
}
