use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error(transparent)]
    Decode(#[from] anyhow::Error),
    #[error("invalid audio input: {0}")]
    InvalidInput(String),
    #[error("resampling failed: {0}")]
    Resample(String),
    #[error("fft failed: {0}")]
    Fft(String),
}
