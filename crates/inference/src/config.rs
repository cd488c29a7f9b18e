use std::fs;
use std::path::{Path, PathBuf};

use moodlens_audio::FeatureConfig;
use moodlens_vision::DetectParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifacts::CachePolicy;
use crate::model::TokenDtype;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Relative artifact paths are resolved against this directory.
    pub model_dir: PathBuf,
    pub cache: CachePolicy,
    pub face: FaceConfig,
    pub text: TextConfig,
    pub audio: AudioConfig,
    pub onnx: OnnxOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("static/models"),
            cache: CachePolicy::default(),
            face: FaceConfig::default(),
            text: TextConfig::default(),
            audio: AudioConfig::default(),
            onnx: OnnxOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaceConfig {
    pub model: PathBuf,
    pub cascade: PathBuf,
    pub scale_factor: f64,
    pub min_neighbors: u32,
    /// Side length of the square network input.
    pub input_size: u32,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("face_emotion_model.onnx"),
            cascade: PathBuf::from("haarcascade_frontalface_default.xml"),
            scale_factor: 1.3,
            min_neighbors: 5,
            input_size: 48,
        }
    }
}

impl FaceConfig {
    pub fn detect_params(&self) -> DetectParams {
        DetectParams {
            scale_factor: self.scale_factor,
            min_neighbors: self.min_neighbors,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextConfig {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
    pub label_encoder: PathBuf,
    pub max_length: usize,
    pub token_dtype: TokenDtype,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("text_emotion_model.onnx"),
            tokenizer: PathBuf::from("text_tokenizer.json"),
            label_encoder: PathBuf::from("text_label_encoder.json"),
            max_length: 100,
            token_dtype: TokenDtype::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub model: PathBuf,
    pub label_encoder: PathBuf,
    pub sample_rate: u32,
    pub duration_secs: f32,
    pub n_mfcc: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let features = FeatureConfig::default();
        Self {
            model: PathBuf::from("audio_emotion_model.onnx"),
            label_encoder: PathBuf::from("audio_label_encoder.json"),
            sample_rate: features.sample_rate,
            duration_secs: features.duration_secs,
            n_mfcc: features.n_mfcc,
        }
    }
}

impl AudioConfig {
    pub fn features(&self) -> FeatureConfig {
        FeatureConfig {
            sample_rate: self.sample_rate,
            duration_secs: self.duration_secs,
            n_mfcc: self.n_mfcc,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OnnxOptions {
    pub intra_threads: usize,
}

impl Default for OnnxOptions {
    fn default() -> Self {
        Self { intra_threads: 1 }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.face.scale_factor > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "face.scale_factor must exceed 1, got {}",
                self.face.scale_factor
            )));
        }
        if self.face.input_size == 0 {
            return Err(ConfigError::Invalid("face.input_size must be positive".into()));
        }
        if self.text.max_length == 0 {
            return Err(ConfigError::Invalid("text.max_length must be positive".into()));
        }
        if self.audio.sample_rate == 0 || !(self.audio.duration_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "audio.sample_rate and audio.duration_secs must be positive".into(),
            ));
        }
        if self.audio.n_mfcc == 0 {
            return Err(ConfigError::Invalid("audio.n_mfcc must be positive".into()));
        }
        if self.onnx.intra_threads == 0 {
            return Err(ConfigError::Invalid("onnx.intra_threads must be positive".into()));
        }
        Ok(())
    }

    /// Joins `file` onto `model_dir` unless it is already absolute.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.model_dir.join(file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.face.min_neighbors, 5);
        assert_eq!(config.text.max_length, 100);
        assert_eq!(config.audio.n_mfcc, 40);
        assert_eq!(config.cache, CachePolicy::LoadOnce);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_yaml_str(
            "model_dir: /srv/models\ncache: reload_each_call\ntext:\n  token_dtype: int64\n",
        )
        .unwrap();
        assert_eq!(config.cache, CachePolicy::ReloadEachCall);
        assert_eq!(config.text.token_dtype, TokenDtype::Int64);
        assert_eq!(config.text.tokenizer, PathBuf::from("text_tokenizer.json"));
        assert_eq!(
            config.resolve(&config.text.tokenizer),
            PathBuf::from("/srv/models/text_tokenizer.json")
        );
    }

    #[test]
    fn absolute_paths_are_not_rebased() {
        let config = EngineConfig::default();
        let absolute = PathBuf::from("/opt/cascade.xml");
        assert_eq!(config.resolve(&absolute), absolute);
        assert_eq!(
            config.resolve(&config.face.model),
            PathBuf::from("static/models/face_emotion_model.onnx")
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(EngineConfig::from_yaml_str("face:\n  scale_factor: 1.0\n").is_err());
        assert!(EngineConfig::from_yaml_str("text:\n  max_length: 0\n").is_err());
        assert!(EngineConfig::from_yaml_str("cache: sometimes\n").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(matches!(
            EngineConfig::load("no/such/engine.yaml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
