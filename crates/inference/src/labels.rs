use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::PredictionError;

/// Class index to label string, in the order the classifier was trained with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelDocument {
    Wrapped { classes: Vec<String> },
    Bare(Vec<String>),
}

impl LabelEncoder {
    /// Sorted unique labels, matching what a fitted encoder stores.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();
        Self {
            classes: unique.into_iter().collect(),
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        let classes = match serde_json::from_str(source)? {
            LabelDocument::Wrapped { classes } | LabelDocument::Bare(classes) => classes,
        };
        Ok(Self { classes })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PredictionError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .map_err(|e| PredictionError::artifact("label encoder", path, e))?;
        let encoder = Self::from_json_str(&source)
            .map_err(|e| PredictionError::artifact("label encoder", path, e))?;
        if encoder.classes.is_empty() {
            return Err(PredictionError::artifact("label encoder", path, "no classes"));
        }
        Ok(encoder)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn decode(&self, index: usize) -> Result<&str, PredictionError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(PredictionError::LabelIndex {
                index,
                classes: self.classes.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_sorts_and_dedups() {
        let encoder = LabelEncoder::fit(["sad", "happy", "anger", "happy"]);
        assert_eq!(encoder.classes, vec!["anger", "happy", "sad"]);
        assert_eq!(encoder.decode(1).unwrap(), "happy");
    }

    #[test]
    fn decode_out_of_range_fails() {
        let encoder = LabelEncoder::fit(["happy"]);
        assert!(matches!(
            encoder.decode(3),
            Err(PredictionError::LabelIndex { index: 3, classes: 1 })
        ));
    }

    #[test]
    fn reads_wrapped_and_bare_documents() {
        let wrapped = LabelEncoder::from_json_str(r#"{"classes": ["angry", "calm"]}"#).unwrap();
        let bare = LabelEncoder::from_json_str(r#"["angry", "calm"]"#).unwrap();
        assert_eq!(wrapped, bare);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        let encoder = LabelEncoder::fit(["fear", "neutral"]);
        encoder.save(&path).unwrap();
        assert_eq!(LabelEncoder::load(&path).unwrap(), encoder);
    }

    #[test]
    fn empty_encoder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, r#"{"classes": []}"#).unwrap();
        assert!(LabelEncoder::load(&path).is_err());
    }
}
