use moodlens_domain::{LabelTable, Prediction};
use ndarray::Array2;
use tracing::{debug, instrument};

use crate::artifacts::TextArtifacts;
use crate::model::{top_class, ModelInput};
use crate::PredictionError;

pub struct TextPredictor {
    max_length: usize,
}

impl TextPredictor {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    #[instrument(skip_all, fields(chars = text.chars().count()))]
    pub fn predict(
        &self,
        artifacts: &TextArtifacts,
        text: &str,
    ) -> Result<Prediction, PredictionError> {
        let ids = artifacts.tokenizer.encode(text, self.max_length);
        debug!(
            known = ids.iter().filter(|id| **id != 0).count(),
            "tokenized text"
        );
        let tokens = Array2::from_shape_vec(
            (1, self.max_length),
            ids.into_iter().map(i64::from).collect(),
        )
        .map_err(|e| PredictionError::Inference(e.to_string()))?;
        let scores = artifacts.model.predict(ModelInput::Tokens(tokens))?;
        let (index, confidence) = top_class(&scores)?;
        let raw = artifacts.labels.decode(index)?;
        Ok(Prediction::new(LabelTable::TEXT.normalize(raw), confidence))
    }
}
