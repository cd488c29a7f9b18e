//! Loading and caching of trained artifacts per modality.

use std::sync::{Arc, PoisonError, RwLock};

use moodlens_domain::Modality;
use moodlens_text::TextTokenizer;
use moodlens_vision::{CascadeDetector, FaceDetector};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::labels::LabelEncoder;
use crate::model::{EmotionModel, OnnxModel, TokenDtype};
use crate::PredictionError;

pub struct FaceArtifacts {
    pub model: Box<dyn EmotionModel>,
    pub detector: Box<dyn FaceDetector>,
}

pub struct TextArtifacts {
    pub model: Box<dyn EmotionModel>,
    pub tokenizer: TextTokenizer,
    pub labels: LabelEncoder,
}

pub struct AudioArtifacts {
    pub model: Box<dyn EmotionModel>,
    pub labels: LabelEncoder,
}

pub trait ArtifactLoader: Send + Sync {
    fn load_face(&self) -> Result<FaceArtifacts, PredictionError>;
    fn load_text(&self) -> Result<TextArtifacts, PredictionError>;
    fn load_audio(&self) -> Result<AudioArtifacts, PredictionError>;
}

/// Reads ONNX models, JSON vocabularies and the cascade XML from the
/// configured model directory.
pub struct DiskLoader {
    config: EngineConfig,
}

impl DiskLoader {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl ArtifactLoader for DiskLoader {
    fn load_face(&self) -> Result<FaceArtifacts, PredictionError> {
        let face = &self.config.face;
        let model = OnnxModel::load(
            &self.config.resolve(&face.model),
            &self.config.onnx,
            TokenDtype::default(),
        )?;
        let cascade_path = self.config.resolve(&face.cascade);
        let detector = CascadeDetector::load(&cascade_path, face.detect_params())
            .map_err(|e| PredictionError::artifact("face cascade", &cascade_path, e))?;
        Ok(FaceArtifacts {
            model: Box::new(model),
            detector: Box::new(detector),
        })
    }

    fn load_text(&self) -> Result<TextArtifacts, PredictionError> {
        let text = &self.config.text;
        let model = OnnxModel::load(
            &self.config.resolve(&text.model),
            &self.config.onnx,
            text.token_dtype,
        )?;
        let tokenizer_path = self.config.resolve(&text.tokenizer);
        let tokenizer = TextTokenizer::load(&tokenizer_path)
            .map_err(|e| PredictionError::artifact("tokenizer", &tokenizer_path, e))?;
        let labels = LabelEncoder::load(self.config.resolve(&text.label_encoder))?;
        Ok(TextArtifacts {
            model: Box::new(model),
            tokenizer,
            labels,
        })
    }

    fn load_audio(&self) -> Result<AudioArtifacts, PredictionError> {
        let audio = &self.config.audio;
        let model = OnnxModel::load(
            &self.config.resolve(&audio.model),
            &self.config.onnx,
            TokenDtype::default(),
        )?;
        let labels = LabelEncoder::load(self.config.resolve(&audio.label_encoder))?;
        Ok(AudioArtifacts {
            model: Box::new(model),
            labels,
        })
    }
}

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    #[default]
    LoadOnce,
    ReloadEachCall,
}

type Slot<T> = RwLock<Option<Arc<T>>>;

pub struct ArtifactStore<L> {
    loader: L,
    policy: CachePolicy,
    face: Slot<FaceArtifacts>,
    text: Slot<TextArtifacts>,
    audio: Slot<AudioArtifacts>,
}

impl<L: ArtifactLoader> ArtifactStore<L> {
    pub fn new(loader: L, policy: CachePolicy) -> Self {
        Self {
            loader,
            policy,
            face: RwLock::new(None),
            text: RwLock::new(None),
            audio: RwLock::new(None),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn face(&self) -> Result<Arc<FaceArtifacts>, PredictionError> {
        fetch(&self.face, self.policy, Modality::Face, || self.loader.load_face())
    }

    pub fn text(&self) -> Result<Arc<TextArtifacts>, PredictionError> {
        fetch(&self.text, self.policy, Modality::Text, || self.loader.load_text())
    }

    pub fn audio(&self) -> Result<Arc<AudioArtifacts>, PredictionError> {
        fetch(&self.audio, self.policy, Modality::Audio, || self.loader.load_audio())
    }

    pub fn is_cached(&self, modality: Modality) -> bool {
        match modality {
            Modality::Face => occupied(&self.face),
            Modality::Text => occupied(&self.text),
            Modality::Audio => occupied(&self.audio),
        }
    }

    /// Drops the cached artifacts; the next prediction loads them again.
    pub fn invalidate(&self, modality: Modality) {
        match modality {
            Modality::Face => clear(&self.face),
            Modality::Text => clear(&self.text),
            Modality::Audio => clear(&self.audio),
        }
    }

    pub fn invalidate_all(&self) {
        for modality in Modality::ALL {
            self.invalidate(modality);
        }
    }

    /// Replaces the cached artifacts with a fresh load. On failure the
    /// modality is left uncached.
    pub fn reload(&self, modality: Modality) -> Result<(), PredictionError> {
        self.invalidate(modality);
        self.ensure(modality)
    }

    pub fn preload(&self) -> Result<(), PredictionError> {
        for modality in Modality::ALL {
            self.ensure(modality)?;
        }
        Ok(())
    }

    fn ensure(&self, modality: Modality) -> Result<(), PredictionError> {
        match modality {
            Modality::Face => self.face().map(drop),
            Modality::Text => self.text().map(drop),
            Modality::Audio => self.audio().map(drop),
        }
    }
}

fn fetch<T>(
    slot: &Slot<T>,
    policy: CachePolicy,
    modality: Modality,
    load: impl FnOnce() -> Result<T, PredictionError>,
) -> Result<Arc<T>, PredictionError> {
    if policy == CachePolicy::ReloadEachCall {
        return load().map(Arc::new);
    }
    if let Some(cached) = slot.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
        return Ok(Arc::clone(cached));
    }
    let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(cached) = guard.as_ref() {
        return Ok(Arc::clone(cached));
    }
    let loaded = Arc::new(load()?);
    *guard = Some(Arc::clone(&loaded));
    info!(%modality, "cached artifacts");
    Ok(loaded)
}

fn occupied<T>(slot: &Slot<T>) -> bool {
    slot.read().unwrap_or_else(PoisonError::into_inner).is_some()
}

fn clear<T>(slot: &Slot<T>) {
    slot.write().unwrap_or_else(PoisonError::into_inner).take();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubLoader;
    use std::path::PathBuf;

    #[test]
    fn load_once_caches_until_invalidated() {
        let store = ArtifactStore::new(StubLoader::default(), CachePolicy::LoadOnce);
        store.text().unwrap();
        store.text().unwrap();
        assert_eq!(store.loader().load_count(Modality::Text), 1);
        assert!(store.is_cached(Modality::Text));
        assert!(!store.is_cached(Modality::Face));

        store.invalidate(Modality::Text);
        assert!(!store.is_cached(Modality::Text));
        store.text().unwrap();
        assert_eq!(store.loader().load_count(Modality::Text), 2);
    }

    #[test]
    fn concurrent_first_use_loads_once() {
        let store = ArtifactStore::new(StubLoader::default(), CachePolicy::LoadOnce);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    store.text().unwrap();
                });
            }
        });
        assert_eq!(store.loader().load_count(Modality::Text), 1);
        assert!(store.is_cached(Modality::Text));
    }

    #[test]
    fn reload_each_call_never_caches() {
        let store = ArtifactStore::new(StubLoader::default(), CachePolicy::ReloadEachCall);
        for _ in 0..3 {
            store.audio().unwrap();
        }
        assert_eq!(store.loader().load_count(Modality::Audio), 3);
        assert!(!store.is_cached(Modality::Audio));
    }

    #[test]
    fn failed_load_is_retried() {
        let loader = StubLoader::default();
        loader.fail_next_loads(1);
        let store = ArtifactStore::new(loader, CachePolicy::LoadOnce);
        assert!(store.face().is_err());
        assert!(!store.is_cached(Modality::Face));
        assert!(store.face().is_ok());
        assert_eq!(store.loader().load_count(Modality::Face), 2);
    }

    #[test]
    fn cached_artifacts_are_shared() {
        let store = ArtifactStore::new(StubLoader::default(), CachePolicy::LoadOnce);
        let first = store.audio().unwrap();
        let second = store.audio().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn preload_and_invalidate_all() {
        let store = ArtifactStore::new(StubLoader::default(), CachePolicy::LoadOnce);
        store.preload().unwrap();
        assert!(Modality::ALL.iter().all(|m| store.is_cached(*m)));
        store.invalidate_all();
        assert!(Modality::ALL.iter().all(|m| !store.is_cached(*m)));
    }

    #[test]
    fn reload_replaces_cached_entry() {
        let store = ArtifactStore::new(StubLoader::default(), CachePolicy::LoadOnce);
        let before = store.text().unwrap();
        store.reload(Modality::Text).unwrap();
        let after = store.text().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(store.loader().load_count(Modality::Text), 2);
    }

    #[test]
    fn preload_reports_first_failure() {
        let loader = StubLoader::default();
        loader.fail_next_loads(1);
        let store = ArtifactStore::new(loader, CachePolicy::LoadOnce);
        assert!(store.preload().is_err());
        assert!(!store.is_cached(Modality::Face));
        assert!(!store.is_cached(Modality::Text));
    }

    #[test]
    fn disk_loader_reports_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            model_dir: PathBuf::from(dir.path()),
            ..Default::default()
        };
        let store = ArtifactStore::new(DiskLoader::new(config), CachePolicy::LoadOnce);
        for result in [
            store.face().map(drop),
            store.text().map(drop),
            store.audio().map(drop),
        ] {
            assert!(matches!(result, Err(PredictionError::ArtifactLoad { .. })));
        }
    }
}
