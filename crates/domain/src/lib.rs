pub mod error;
pub mod labels;
pub mod modality;
pub mod motivation;
pub mod prediction;

pub use crate::error::DomainError;
pub use crate::labels::{capitalize, Emotion, EmotionLabel, LabelTable, EMOTION_LABELS};
pub use crate::modality::Modality;
pub use crate::motivation::{get_motivation_message, motivation_with_rng, FALLBACK_MESSAGE};
pub use crate::prediction::{Prediction, PredictionOutcome};
