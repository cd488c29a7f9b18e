use std::path::Path;

use moodlens_audio::{AudioFeatureExtractor, FeatureConfig};
use moodlens_domain::{LabelTable, Prediction};
use ndarray::Axis;
use tracing::{debug, instrument};

use crate::artifacts::AudioArtifacts;
use crate::model::{top_class, ModelInput};
use crate::PredictionError;

pub struct AudioPredictor {
    extractor: AudioFeatureExtractor,
}

impl AudioPredictor {
    pub fn new(config: FeatureConfig) -> Result<Self, PredictionError> {
        Ok(Self {
            extractor: AudioFeatureExtractor::new(config)?,
        })
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn predict(
        &self,
        artifacts: &AudioArtifacts,
        path: &Path,
    ) -> Result<Prediction, PredictionError> {
        let features = self.extractor.extract_path(path)?;
        let batch = features.insert_axis(Axis(0));
        debug!(shape = ?batch.shape(), "audio features ready");
        let scores = artifacts.model.predict(ModelInput::Dense(batch.into_dyn()))?;
        let (index, confidence) = top_class(&scores)?;
        let raw = artifacts.labels.decode(index)?;
        Ok(Prediction::new(LabelTable::AUDIO.normalize(raw), confidence))
    }
}
