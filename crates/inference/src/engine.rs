use std::path::Path;

use moodlens_domain::{get_motivation_message, Modality, Prediction, PredictionOutcome};
use tracing::{debug, warn};

use crate::artifacts::{ArtifactLoader, ArtifactStore, DiskLoader};
use crate::config::EngineConfig;
use crate::predictors::{AudioPredictor, FacePredictor, TextPredictor};
use crate::PredictionError;

pub struct EmotionEngine<L = DiskLoader> {
    store: ArtifactStore<L>,
    face: FacePredictor,
    text: TextPredictor,
    audio: AudioPredictor,
}

impl EmotionEngine<DiskLoader> {
    /// Nothing is loaded until the first prediction.
    pub fn from_config(config: EngineConfig) -> Result<Self, PredictionError> {
        config.validate()?;
        let policy = config.cache;
        let predictors = Predictors::new(&config)?;
        Ok(predictors.attach(ArtifactStore::new(DiskLoader::new(config), policy)))
    }
}

impl<L: ArtifactLoader> EmotionEngine<L> {
    pub fn with_loader(loader: L, config: &EngineConfig) -> Result<Self, PredictionError> {
        config.validate()?;
        let predictors = Predictors::new(config)?;
        Ok(predictors.attach(ArtifactStore::new(loader, config.cache)))
    }

    pub fn store(&self) -> &ArtifactStore<L> {
        &self.store
    }

    pub fn predict_modality(
        &self,
        input: &str,
        modality: Modality,
    ) -> Result<Prediction, PredictionError> {
        match modality {
            Modality::Face => self.face.predict(&*self.store.face()?, Path::new(input)),
            Modality::Text => self.text.predict(&*self.store.text()?, input),
            Modality::Audio => self.audio.predict(&*self.store.audio()?, Path::new(input)),
        }
    }

    /// Like [`predict_emotion`](Self::predict_emotion) but keeps failures
    /// and unknown tags distinguishable.
    pub fn try_predict(&self, input: &str, modality: &str) -> PredictionOutcome {
        let modality = match modality.parse::<Modality>() {
            Ok(modality) => modality,
            Err(_) => {
                debug!(tag = modality, "unknown modality");
                return PredictionOutcome::UnknownModality {
                    tag: modality.to_string(),
                };
            }
        };
        match self.predict_modality(input, modality) {
            Ok(prediction) => PredictionOutcome::Predicted(prediction),
            Err(err) => PredictionOutcome::Failed {
                modality,
                reason: err.to_string(),
            },
        }
    }

    /// Never fails: pipeline errors become `(Neutral, 0.5)` and unknown
    /// modality tags `(Unknown, 0.0)`.
    pub fn predict_emotion(&self, input: &str, modality: &str) -> Prediction {
        let outcome = self.try_predict(input, modality);
        if let PredictionOutcome::Failed { modality, reason } = &outcome {
            warn!(%modality, %reason, "prediction failed, returning neutral fallback");
        }
        outcome.into_prediction()
    }

    pub fn motivation(&self, prediction: &Prediction) -> String {
        get_motivation_message(prediction.emotion.as_str())
    }
}

struct Predictors {
    face: FacePredictor,
    text: TextPredictor,
    audio: AudioPredictor,
}

impl Predictors {
    fn new(config: &EngineConfig) -> Result<Self, PredictionError> {
        Ok(Self {
            face: FacePredictor::new(config.face.input_size),
            text: TextPredictor::new(config.text.max_length),
            audio: AudioPredictor::new(config.audio.features())?,
        })
    }

    fn attach<L>(self, store: ArtifactStore<L>) -> EmotionEngine<L> {
        EmotionEngine {
            store,
            face: self.face,
            text: self.text,
            audio: self.audio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::CachePolicy;
    use crate::model::ModelInput;
    use crate::testing::StubLoader;
    use image::{GrayImage, Luma};
    use moodlens_domain::{Emotion, EmotionLabel, FALLBACK_MESSAGE};
    use moodlens_vision::Rect;

    fn engine(loader: StubLoader) -> EmotionEngine<StubLoader> {
        EmotionEngine::with_loader(loader, &EngineConfig::default()).unwrap()
    }

    fn write_wav(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let sample = ((i % 100) as i16 - 50) * 300;
            writer.write_sample(sample).unwrap();
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn routes_each_modality() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("face.png");
        GrayImage::from_pixel(64, 64, Luma([90])).save(&image_path).unwrap();
        let audio_path = dir.path().join("clip.wav");
        write_wav(&audio_path, 44_100);

        let engine = engine(StubLoader {
            faces: vec![Rect::new(8, 8, 32, 32)],
            ..Default::default()
        });
        let face = engine.predict_emotion(image_path.to_str().unwrap(), "face");
        assert_eq!(face, Prediction::new(EmotionLabel::Happy, 0.7));

        let text = engine.predict_emotion("i am so happy", "text");
        assert_eq!(text, Prediction::new(EmotionLabel::Happy, 0.8));

        let audio = engine.predict_emotion(audio_path.to_str().unwrap(), "audio");
        assert_eq!(audio, Prediction::new(EmotionLabel::Angry, 0.6));

        let shapes: Vec<Vec<usize>> = engine
            .store()
            .loader()
            .recorded_inputs()
            .iter()
            .map(|input| input.shape().to_vec())
            .collect();
        assert_eq!(shapes, vec![vec![1, 48, 48, 1], vec![1, 100], vec![1, 40]]);
    }

    #[test]
    fn unknown_modality_is_not_an_error() {
        let engine = engine(StubLoader::default());
        let outcome = engine.try_predict("anything", "smell");
        assert_eq!(
            outcome,
            PredictionOutcome::UnknownModality { tag: "smell".into() }
        );
        let prediction = engine.predict_emotion("anything", "Face");
        assert_eq!(prediction.emotion, Emotion::Unknown);
        assert_eq!(prediction.confidence, 0.0);
        assert_eq!(engine.store().loader().load_count(Modality::Face), 0);
    }

    #[test]
    fn failures_collapse_to_neutral() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.wav");
        write_wav(&empty, 0);
        let engine = engine(StubLoader::default());

        match engine.try_predict(empty.to_str().unwrap(), "audio") {
            PredictionOutcome::Failed { modality, .. } => assert_eq!(modality, Modality::Audio),
            other => panic!("expected failure, got {other:?}"),
        }
        let missing = dir.path().join("missing.png");
        assert_eq!(
            engine.predict_emotion(missing.to_str().unwrap(), "face"),
            Prediction::failure_sentinel()
        );
    }

    #[test]
    fn load_failure_is_retried_on_next_call() {
        let loader = StubLoader::default();
        loader.fail_next_loads(1);
        let engine = engine(loader);
        assert_eq!(engine.predict_emotion("happy", "text"), Prediction::failure_sentinel());
        assert!(engine.try_predict("happy", "text").is_predicted());
        assert_eq!(engine.store().loader().load_count(Modality::Text), 2);
    }

    #[test]
    fn artifacts_load_once_by_default() {
        let engine = engine(StubLoader::default());
        for text in ["i am sad", "so happy", ""] {
            assert!(engine.try_predict(text, "text").is_predicted());
        }
        assert_eq!(engine.store().loader().load_count(Modality::Text), 1);
    }

    #[test]
    fn reload_each_call_policy_reloads() {
        let config = EngineConfig {
            cache: CachePolicy::ReloadEachCall,
            ..Default::default()
        };
        let engine = EmotionEngine::with_loader(StubLoader::default(), &config).unwrap();
        engine.predict_emotion("sad", "text");
        engine.predict_emotion("sad", "text");
        assert_eq!(engine.store().loader().load_count(Modality::Text), 2);
    }

    #[test]
    fn empty_text_predicts_from_padding() {
        let engine = engine(StubLoader::default());
        assert!(engine.try_predict("", "text").is_predicted());
        match engine.store().loader().recorded_inputs().first() {
            Some(ModelInput::Tokens(tokens)) => assert!(tokens.iter().all(|id| *id == 0)),
            other => panic!("unexpected input {other:?}"),
        }
    }

    #[test]
    fn motivation_matches_label() {
        let engine = engine(StubLoader::default());
        let message = engine.motivation(&Prediction::new(EmotionLabel::Sad, 0.9));
        assert_ne!(message, FALLBACK_MESSAGE);
        assert_eq!(engine.motivation(&Prediction::unknown_modality()), FALLBACK_MESSAGE);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            text: crate::config::TextConfig {
                max_length: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(EmotionEngine::with_loader(StubLoader::default(), &config).is_err());
    }
}
