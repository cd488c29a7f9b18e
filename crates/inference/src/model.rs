//! Classifier backends.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array2, ArrayD};
use ort::session::Session;
use ort::value::Tensor;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::OnnxOptions;
use crate::PredictionError;

/// Element type the text network expects for its token input.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenDtype {
    #[default]
    Float32,
    Int32,
    Int64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelInput {
    Dense(ArrayD<f32>),
    /// Padded token ids, shaped `(batch, max_length)`.
    Tokens(Array2<i64>),
}

impl ModelInput {
    pub fn shape(&self) -> &[usize] {
        match self {
            ModelInput::Dense(array) => array.shape(),
            ModelInput::Tokens(array) => array.shape(),
        }
    }
}

pub trait EmotionModel: Send + Sync {
    /// Runs one forward pass and returns the flattened class scores of the
    /// first output.
    fn predict(&self, input: ModelInput) -> Result<Vec<f32>, PredictionError>;
}

pub struct OnnxModel {
    session: Mutex<Session>,
    token_dtype: TokenDtype,
}

impl OnnxModel {
    pub fn load(
        path: &Path,
        options: &OnnxOptions,
        token_dtype: TokenDtype,
    ) -> Result<Self, PredictionError> {
        if !path.exists() {
            return Err(PredictionError::artifact("model", path, "file not found"));
        }
        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(options.intra_threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| PredictionError::artifact("model", path, e))?;
        info!(path = ?path, "loaded onnx model");
        Ok(Self {
            session: Mutex::new(session),
            token_dtype,
        })
    }
}

fn inference_error(e: impl std::fmt::Display) -> PredictionError {
    PredictionError::Inference(e.to_string())
}

impl EmotionModel for OnnxModel {
    fn predict(&self, input: ModelInput) -> Result<Vec<f32>, PredictionError> {
        debug!(shape = ?input.shape(), "running onnx session");
        let mut session = self
            .session
            .lock()
            .map_err(|_| PredictionError::Inference("onnx session lock poisoned".into()))?;

        let outputs = match input {
            ModelInput::Dense(array) => {
                let tensor = Tensor::from_array(array).map_err(inference_error)?;
                session.run(ort::inputs![tensor])
            }
            ModelInput::Tokens(tokens) => match self.token_dtype {
                TokenDtype::Float32 => {
                    let tensor =
                        Tensor::from_array(tokens.mapv(|id| id as f32)).map_err(inference_error)?;
                    session.run(ort::inputs![tensor])
                }
                TokenDtype::Int32 => {
                    let tensor =
                        Tensor::from_array(tokens.mapv(|id| id as i32)).map_err(inference_error)?;
                    session.run(ort::inputs![tensor])
                }
                TokenDtype::Int64 => {
                    let tensor = Tensor::from_array(tokens).map_err(inference_error)?;
                    session.run(ort::inputs![tensor])
                }
            },
        }
        .map_err(inference_error)?;

        let (_, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| PredictionError::InvalidOutput("model produced no output".into()))?;
        let (_shape, scores) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| PredictionError::InvalidOutput(e.to_string()))?;
        Ok(scores.to_vec())
    }
}

/// Index and score of the highest class; ties go to the lowest index.
///
/// The score is clamped into `[0, 1]` so it can be reported as a confidence.
pub fn top_class(scores: &[f32]) -> Result<(usize, f32), PredictionError> {
    if scores.is_empty() {
        return Err(PredictionError::InvalidOutput("empty score vector".into()));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(PredictionError::InvalidOutput(format!(
            "non-finite class score {bad}"
        )));
    }
    let mut best = 0;
    for (index, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = index;
        }
    }
    Ok((best, scores[best].clamp(0.0, 1.0)))
}
