use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cascade: {0}")]
    Cascade(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl VisionError {
    pub fn cascade<T: Into<String>>(message: T) -> Self {
        Self::Cascade(message.into())
    }
}
