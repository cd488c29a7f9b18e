//! Emotion prediction across face images, text and audio clips.

use std::sync::OnceLock;

pub mod artifacts;
pub mod config;
pub mod engine;
pub mod error;
pub mod labels;
pub mod model;
pub mod predictors;
#[cfg(test)]
mod testing;

pub use artifacts::{
    ArtifactLoader, ArtifactStore, AudioArtifacts, CachePolicy, DiskLoader, FaceArtifacts,
    TextArtifacts,
};
pub use config::{AudioConfig, ConfigError, EngineConfig, FaceConfig, OnnxOptions, TextConfig};
pub use engine::EmotionEngine;
pub use error::PredictionError;
pub use labels::LabelEncoder;
pub use model::{top_class, EmotionModel, ModelInput, OnnxModel, TokenDtype};
pub use moodlens_domain::{
    get_motivation_message, Emotion, EmotionLabel, Modality, Prediction, PredictionOutcome,
};

static DEFAULT_ENGINE: OnceLock<Option<EmotionEngine>> = OnceLock::new();

fn default_engine() -> Option<&'static EmotionEngine> {
    DEFAULT_ENGINE
        .get_or_init(|| match EmotionEngine::from_config(EngineConfig::default()) {
            Ok(engine) => Some(engine),
            Err(err) => {
                tracing::warn!(%err, "default emotion engine unavailable");
                None
            }
        })
        .as_ref()
}

/// Predicts with a process-wide engine reading artifacts from
/// `static/models`. Artifacts are loaded on first use and then kept.
pub fn predict_emotion(input: &str, modality: &str) -> Prediction {
    match default_engine() {
        Some(engine) => engine.predict_emotion(input, modality),
        None if modality.parse::<Modality>().is_ok() => Prediction::failure_sentinel(),
        None => Prediction::unknown_modality(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_degrades_without_artifacts() {
        assert_eq!(
            predict_emotion("nothing to see", "text"),
            Prediction::failure_sentinel()
        );
        assert_eq!(predict_emotion("x", "video"), Prediction::unknown_modality());
    }
}
