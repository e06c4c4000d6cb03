//! Model artifact layout and path validation.

use std::path::{Path, PathBuf};

use crate::errors::{EmbeddingError, Result};

/// Typed paths for the files a loadable model directory must contain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelFiles {
    /// Vocabulary and tokenization rules (`tokenizer.json`).
    pub tokenizer: PathBuf,
    /// Serialized inference graph (`model.onnx`).
    pub model: PathBuf,
}

impl ModelFiles {
    /// Tokenizer file name inside a model directory.
    pub const TOKENIZER: &str = "tokenizer.json";
    /// Graph file name inside a model directory.
    pub const MODEL: &str = "model.onnx";

    /// Construct paths for all model files under `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            tokenizer: dir.join(Self::TOKENIZER),
            model: dir.join(Self::MODEL),
        }
    }

    /// Validate `dir` and construct the file paths under it.
    ///
    /// Only the directory itself is checked here; missing files surface as
    /// tokenizer or model load errors when they are opened.
    pub fn locate(dir: &Path) -> Result<Self> {
        if dir.as_os_str().is_empty() {
            return Err(EmbeddingError::Config("model path is empty".into()));
        }
        if !dir.is_dir() {
            return Err(EmbeddingError::Config(format!(
                "model path is not a directory: {}",
                dir.display()
            )));
        }
        Ok(Self::from_dir(dir))
    }

    /// Check if both required files exist.
    pub fn all_exist(&self) -> bool {
        self.tokenizer.exists() && self.model.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_dir_constructs_all_paths() {
        let files = ModelFiles::from_dir("/models/e5-small");
        assert_eq!(files.tokenizer, PathBuf::from("/models/e5-small/tokenizer.json"));
        assert_eq!(files.model, PathBuf::from("/models/e5-small/model.onnx"));
    }

    #[test]
    fn locate_rejects_empty_path() {
        let err = ModelFiles::locate(Path::new("")).unwrap_err();
        assert!(matches!(err, EmbeddingError::Config(msg) if msg.contains("empty")));
    }

    #[test]
    fn locate_rejects_missing_dir() {
        let err = ModelFiles::locate(Path::new("/nonexistent/model/dir")).unwrap_err();
        assert!(matches!(err, EmbeddingError::Config(msg) if msg.contains("not a directory")));
    }

    #[test]
    fn locate_rejects_regular_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("model.onnx");
        std::fs::write(&file, b"").unwrap();
        assert!(matches!(
            ModelFiles::locate(&file),
            Err(EmbeddingError::Config(_))
        ));
    }

    #[test]
    fn locate_accepts_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let files = ModelFiles::locate(tmp.path()).unwrap();
        assert!(!files.all_exist());
    }

    #[test]
    fn all_exist_partial_and_complete() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(ModelFiles::TOKENIZER), b"{}").unwrap();
        let files = ModelFiles::from_dir(tmp.path());
        assert!(!files.all_exist());

        std::fs::write(tmp.path().join(ModelFiles::MODEL), b"").unwrap();
        assert!(files.all_exist());
    }
}
