pub mod cascade;
pub mod detect;
pub mod error;
pub mod grouping;
pub mod integral;
pub mod preprocess;
mod xml;

pub use cascade::HaarCascade;
pub use detect::{CascadeDetector, DetectParams, FaceDetector};
pub use error::VisionError;
pub use grouping::{group_rectangles, Rect};
pub use integral::IntegralImage;
pub use preprocess::{crop, face_tensor, load_grayscale};
