use std::path::Path;

use moodlens_domain::{EmotionLabel, Prediction, EMOTION_LABELS};
use moodlens_vision::{crop, face_tensor, load_grayscale};
use tracing::{debug, instrument};

use crate::artifacts::FaceArtifacts;
use crate::model::{top_class, ModelInput};
use crate::PredictionError;

pub struct FacePredictor {
    input_size: u32,
}

impl FacePredictor {
    pub fn new(input_size: u32) -> Self {
        Self { input_size }
    }

    /// Classifies the first detected face, or the whole image when the
    /// detector finds none.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn predict(
        &self,
        artifacts: &FaceArtifacts,
        path: &Path,
    ) -> Result<Prediction, PredictionError> {
        let image = load_grayscale(path)?;
        let faces = artifacts.detector.detect(&image)?;
        debug!(faces = faces.len(), first = ?faces.first(), "face detection");
        let face = match faces.first() {
            Some(rect) => crop(&image, *rect)?,
            None => image,
        };
        let tensor = face_tensor(&face, self.input_size)?;
        let scores = artifacts.model.predict(ModelInput::Dense(tensor.into_dyn()))?;
        let (index, confidence) = top_class(&scores)?;
        let label = EmotionLabel::from_index(index).ok_or(PredictionError::LabelIndex {
            index,
            classes: EMOTION_LABELS.len(),
        })?;
        Ok(Prediction::new(label, confidence))
    }
}
