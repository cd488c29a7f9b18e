//! In-memory stand-ins for trained artifacts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::GrayImage;
use moodlens_domain::Modality;
use moodlens_text::{TextTokenizer, TokenizerOptions};
use moodlens_vision::{FaceDetector, Rect, VisionError};

use crate::artifacts::{ArtifactLoader, AudioArtifacts, FaceArtifacts, TextArtifacts};
use crate::labels::LabelEncoder;
use crate::model::{EmotionModel, ModelInput};
use crate::PredictionError;

pub(crate) type InputLog = Arc<Mutex<Vec<ModelInput>>>;

/// Returns fixed scores and records every input it sees.
pub(crate) struct StubModel {
    pub scores: Vec<f32>,
    pub inputs: InputLog,
}

impl EmotionModel for StubModel {
    fn predict(&self, input: ModelInput) -> Result<Vec<f32>, PredictionError> {
        self.inputs.lock().unwrap().push(input);
        Ok(self.scores.clone())
    }
}

pub(crate) struct FixedDetector(pub Vec<Rect>);

impl FaceDetector for FixedDetector {
    fn detect(&self, _image: &GrayImage) -> Result<Vec<Rect>, VisionError> {
        Ok(self.0.clone())
    }
}

pub(crate) struct StubLoader {
    pub face_scores: Vec<f32>,
    pub text_scores: Vec<f32>,
    pub audio_scores: Vec<f32>,
    pub faces: Vec<Rect>,
    pub text_labels: Vec<&'static str>,
    pub audio_labels: Vec<&'static str>,
    pub inputs: InputLog,
    pub loads: [AtomicUsize; 3],
    pub failures: AtomicUsize,
}

impl Default for StubLoader {
    fn default() -> Self {
        Self {
            face_scores: vec![0.05, 0.0, 0.05, 0.7, 0.1, 0.05, 0.05],
            text_scores: vec![0.1, 0.8, 0.1],
            audio_scores: vec![0.6, 0.2, 0.1, 0.1],
            faces: Vec::new(),
            text_labels: vec!["anger", "happy", "sad"],
            audio_labels: vec!["angry", "calm", "happy", "sad"],
            inputs: Arc::default(),
            loads: Default::default(),
            failures: AtomicUsize::new(0),
        }
    }
}

impl StubLoader {
    pub fn load_count(&self, modality: Modality) -> usize {
        self.loads[slot(modality)].load(Ordering::SeqCst)
    }

    /// Makes the next `count` loads of any modality fail.
    pub fn fail_next_loads(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn recorded_inputs(&self) -> Vec<ModelInput> {
        self.inputs.lock().unwrap().clone()
    }

    fn begin(&self, modality: Modality) -> Result<(), PredictionError> {
        self.loads[slot(modality)].fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PredictionError::artifact(
                "model",
                std::path::Path::new("stub.onnx"),
                "stub failure",
            ));
        }
        Ok(())
    }

    fn model(&self, scores: &[f32]) -> Box<dyn EmotionModel> {
        Box::new(StubModel {
            scores: scores.to_vec(),
            inputs: Arc::clone(&self.inputs),
        })
    }
}

fn slot(modality: Modality) -> usize {
    match modality {
        Modality::Face => 0,
        Modality::Text => 1,
        Modality::Audio => 2,
    }
}

impl ArtifactLoader for StubLoader {
    fn load_face(&self) -> Result<FaceArtifacts, PredictionError> {
        self.begin(Modality::Face)?;
        Ok(FaceArtifacts {
            model: self.model(&self.face_scores),
            detector: Box::new(FixedDetector(self.faces.clone())),
        })
    }

    fn load_text(&self) -> Result<TextArtifacts, PredictionError> {
        self.begin(Modality::Text)?;
        let options = TokenizerOptions {
            oov_token: Some("<OOV>".into()),
            ..Default::default()
        };
        let tokenizer = TextTokenizer::fit(options, ["i am so happy", "i am sad"])?;
        Ok(TextArtifacts {
            model: self.model(&self.text_scores),
            tokenizer,
            labels: LabelEncoder::fit(self.text_labels.iter()),
        })
    }

    fn load_audio(&self) -> Result<AudioArtifacts, PredictionError> {
        self.begin(Modality::Audio)?;
        Ok(AudioArtifacts {
            model: self.model(&self.audio_scores),
            labels: LabelEncoder::fit(self.audio_labels.iter()),
        })
    }
}
