use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::DomainError;

/// Canonical emotion classes in the output order of the face classifier.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

pub const EMOTION_LABELS: [EmotionLabel; 7] = [
    EmotionLabel::Angry,
    EmotionLabel::Disgust,
    EmotionLabel::Fear,
    EmotionLabel::Happy,
    EmotionLabel::Sad,
    EmotionLabel::Surprise,
    EmotionLabel::Neutral,
];

impl EmotionLabel {
    pub fn from_index(index: usize) -> Option<Self> {
        EMOTION_LABELS.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Angry => "Angry",
            EmotionLabel::Disgust => "Disgust",
            EmotionLabel::Fear => "Fear",
            EmotionLabel::Happy => "Happy",
            EmotionLabel::Sad => "Sad",
            EmotionLabel::Surprise => "Surprise",
            EmotionLabel::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EMOTION_LABELS
            .iter()
            .copied()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("not a canonical emotion: {s}")))
    }
}

/// Label attached to a prediction.
///
/// Text and audio label encoders can emit classes outside the canonical set;
/// those survive as `Other` holding the capitalized class name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Emotion {
    Known(EmotionLabel),
    Other(String),
    Unknown,
}

impl Emotion {
    pub fn as_str(&self) -> &str {
        match self {
            Emotion::Known(label) => label.as_str(),
            Emotion::Other(name) => name,
            Emotion::Unknown => "Unknown",
        }
    }

    /// Parses a rendered label back. Canonical names and `Unknown` map to
    /// their variants, anything else is kept verbatim.
    pub fn parse(s: &str) -> Self {
        if s == "Unknown" {
            return Emotion::Unknown;
        }
        match s.parse::<EmotionLabel>() {
            Ok(label) => Emotion::Known(label),
            Err(_) => Emotion::Other(s.to_string()),
        }
    }
}

impl From<EmotionLabel> for Emotion {
    fn from(label: EmotionLabel) -> Self {
        Emotion::Known(label)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Emotion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Emotion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Emotion::parse(&raw))
    }
}

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Case-insensitive mapping from a label encoder's class names onto the
/// canonical set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelTable {
    entries: &'static [(&'static str, EmotionLabel)],
}

impl LabelTable {
    pub const TEXT: LabelTable = LabelTable {
        entries: &[
            ("happy", EmotionLabel::Happy),
            ("sad", EmotionLabel::Sad),
            ("anger", EmotionLabel::Angry),
            ("fear", EmotionLabel::Fear),
            ("surprise", EmotionLabel::Surprise),
            ("neutral", EmotionLabel::Neutral),
        ],
    };

    pub const AUDIO: LabelTable = LabelTable {
        entries: &[
            ("happy", EmotionLabel::Happy),
            ("sad", EmotionLabel::Sad),
            ("angry", EmotionLabel::Angry),
            ("fear", EmotionLabel::Fear),
            ("surprise", EmotionLabel::Surprise),
            ("neutral", EmotionLabel::Neutral),
        ],
    };

    pub fn normalize(&self, raw: &str) -> Emotion {
        let lowered = raw.to_lowercase();
        if let Some((_, label)) = self.entries.iter().find(|(key, _)| *key == lowered) {
            return Emotion::Known(*label);
        }
        Emotion::parse(&capitalize(raw))
    }
}
