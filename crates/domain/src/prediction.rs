use serde::{Deserialize, Serialize};

use crate::labels::{Emotion, EmotionLabel};
use crate::modality::Modality;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub emotion: Emotion,
    /// Probability mass of the chosen class, in `[0, 1]`.
    pub confidence: f32,
}

impl Prediction {
    pub const FAILURE_CONFIDENCE: f32 = 0.5;

    pub fn new(emotion: impl Into<Emotion>, confidence: f32) -> Self {
        Self {
            emotion: emotion.into(),
            confidence,
        }
    }

    /// Substitute returned when a modality pipeline cannot complete.
    pub fn failure_sentinel() -> Self {
        Self::new(EmotionLabel::Neutral, Self::FAILURE_CONFIDENCE)
    }

    /// Returned for a modality tag outside the supported set.
    pub fn unknown_modality() -> Self {
        Self {
            emotion: Emotion::Unknown,
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionOutcome {
    Predicted(Prediction),
    Failed { modality: Modality, reason: String },
    UnknownModality { tag: String },
}

impl PredictionOutcome {
    pub fn is_predicted(&self) -> bool {
        matches!(self, PredictionOutcome::Predicted(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            PredictionOutcome::Predicted(_) => "predicted",
            PredictionOutcome::Failed { .. } => "failed",
            PredictionOutcome::UnknownModality { .. } => "unknown_modality",
        }
    }

    /// Collapses failures into the sentinel results callers of
    /// `predict_emotion` expect.
    pub fn into_prediction(self) -> Prediction {
        match self {
            PredictionOutcome::Predicted(prediction) => prediction,
            PredictionOutcome::Failed { .. } => Prediction::failure_sentinel(),
            PredictionOutcome::UnknownModality { .. } => Prediction::unknown_modality(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_collapse_to_sentinels() {
        let failed = PredictionOutcome::Failed {
            modality: Modality::Audio,
            reason: "corrupt".into(),
        };
        assert_eq!(failed.status(), "failed");
        assert_eq!(failed.into_prediction(), Prediction::new(EmotionLabel::Neutral, 0.5));

        let unknown = PredictionOutcome::UnknownModality { tag: "smell".into() };
        let prediction = unknown.into_prediction();
        assert_eq!(prediction.emotion, Emotion::Unknown);
        assert_eq!(prediction.confidence, 0.0);
    }

    #[test]
    fn predicted_passes_through() {
        let outcome = PredictionOutcome::Predicted(Prediction::new(EmotionLabel::Happy, 0.9));
        assert!(outcome.is_predicted());
        assert_eq!(outcome.into_prediction().emotion.as_str(), "Happy");
    }
}
