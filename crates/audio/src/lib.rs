pub mod dsp;
pub mod error;
pub mod features;
pub mod io;
pub mod mfcc;

pub use dsp::resample;
pub use error::AudioError;
pub use features::{AudioFeatureExtractor, FeatureConfig};
pub use io::{AudioDecoder, AudioReader};
pub use mfcc::{MfccConfig, MfccExtractor};
