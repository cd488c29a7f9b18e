use std::path::{Path, PathBuf};

use moodlens_audio::AudioError;
use moodlens_text::TokenizerError;
use moodlens_vision::VisionError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("failed to load {what} from {path:?}: {reason}")]
    ArtifactLoad {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },
    #[error(transparent)]
    Vision(#[from] VisionError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid model output: {0}")]
    InvalidOutput(String),
    #[error("class index {index} outside {classes} known labels")]
    LabelIndex { index: usize, classes: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PredictionError {
    pub fn artifact(what: &'static str, path: &Path, reason: impl ToString) -> Self {
        Self::ArtifactLoad {
            what,
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}
