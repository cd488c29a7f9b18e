use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dsp::resample;
use crate::io::AudioDecoder;
use crate::mfcc::{MfccConfig, MfccExtractor};
use crate::AudioError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FeatureConfig {
    /// Signals are resampled to this rate before analysis.
    pub sample_rate: u32,
    /// Only the first `duration_secs` of a clip are analysed.
    pub duration_secs: f32,
    pub n_mfcc: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            duration_secs: 3.0,
            n_mfcc: 40,
        }
    }
}

/// Turns an audio clip into a mean-pooled MFCC vector.
pub struct AudioFeatureExtractor {
    config: FeatureConfig,
    mfcc: MfccExtractor,
}

impl AudioFeatureExtractor {
    pub fn new(config: FeatureConfig) -> Result<Self, AudioError> {
        if !(config.duration_secs > 0.0) {
            return Err(AudioError::InvalidInput(format!(
                "duration must be positive, got {}",
                config.duration_secs
            )));
        }
        let mfcc = MfccExtractor::new(MfccConfig {
            sample_rate: config.sample_rate,
            n_mfcc: config.n_mfcc,
            ..Default::default()
        })?;
        Ok(Self { config, mfcc })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn extract_path<P: AsRef<Path>>(&self, path: P) -> Result<Array1<f32>, AudioError> {
        let reader = AudioDecoder::open_limited(path.as_ref(), Some(self.config.duration_secs))?;
        let mono = reader.to_mono();
        self.extract_samples(&mono, reader.sample_rate)
    }

    pub fn extract_samples(
        &self,
        mono: &[f32],
        sample_rate: u32,
    ) -> Result<Array1<f32>, AudioError> {
        let signal = resample(mono, sample_rate, self.config.sample_rate)?;
        debug!(
            input_rate = sample_rate,
            samples = signal.len(),
            "extracting mfcc features"
        );
        self.mfcc.mean_pooled(&signal)
    }
}
