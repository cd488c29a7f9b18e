mod audio;
mod face;
mod text;

pub use audio::AudioPredictor;
pub use face::FacePredictor;
pub use text::TextPredictor;
