use std::path::Path;

use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cascade::HaarCascade;
use crate::grouping::{group_rectangles, Rect};
use crate::integral::IntegralImage;
use crate::VisionError;

const GROUP_EPS: f64 = 0.2;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DetectParams {
    pub scale_factor: f64,
    pub min_neighbors: u32,
    /// Smallest detection window considered, in pixels.
    pub min_size: (u32, u32),
    /// Largest detection window considered; the image size when unset.
    pub max_size: Option<(u32, u32)>,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.3,
            min_neighbors: 5,
            min_size: (0, 0),
            max_size: None,
        }
    }
}

pub trait FaceDetector: Send + Sync {
    /// Face boxes in the detector's native order.
    fn detect(&self, image: &GrayImage) -> Result<Vec<Rect>, VisionError>;
}

pub struct CascadeDetector {
    cascade: HaarCascade,
    params: DetectParams,
}

impl CascadeDetector {
    pub fn new(cascade: HaarCascade, params: DetectParams) -> Result<Self, VisionError> {
        if !(params.scale_factor > 1.0) {
            return Err(VisionError::InvalidInput(format!(
                "scale factor must exceed 1, got {}",
                params.scale_factor
            )));
        }
        Ok(Self { cascade, params })
    }

    pub fn load<P: AsRef<Path>>(path: P, params: DetectParams) -> Result<Self, VisionError> {
        Self::new(HaarCascade::load(path)?, params)
    }

    /// Raw window hits across the image pyramid, before grouping.
    pub fn detect_raw(&self, image: &GrayImage) -> Vec<Rect> {
        let (img_w, img_h) = image.dimensions();
        let (win_w, win_h) = self.cascade.window_size();
        let (max_w, max_h) = self.params.max_size.unwrap_or((img_w, img_h));
        let (min_w, min_h) = self.params.min_size;
        let mut hits = Vec::new();
        let mut factor = 1.0f64;

        loop {
            let window_w = (win_w as f64 * factor).round() as u32;
            let window_h = (win_h as f64 * factor).round() as u32;
            let scaled_w = (img_w as f64 / factor).round() as u32;
            let scaled_h = (img_h as f64 / factor).round() as u32;
            if scaled_w <= win_w || scaled_h <= win_h {
                break;
            }
            if window_w > max_w || window_h > max_h {
                break;
            }
            if window_w >= min_w && window_h >= min_h {
                let scaled = if scaled_w == img_w && scaled_h == img_h {
                    image.clone()
                } else {
                    imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle)
                };
                let integral = IntegralImage::new(&scaled);
                let step = scan_step(factor);
                let before = hits.len();
                for y in (0..scaled_h - win_h).step_by(step as usize) {
                    let mut x = 0;
                    while x < scaled_w - win_w {
                        match self.cascade.evaluate(&integral, x, y) {
                            1 => hits.push(Rect::new(
                                (x as f64 * factor).round() as i32,
                                (y as f64 * factor).round() as i32,
                                window_w as i32,
                                window_h as i32,
                            )),
                            0 => x += step,
                            _ => {}
                        }
                        x += step;
                    }
                }
                debug!(factor, window_w, hits = hits.len() - before, "scanned pyramid level");
            }
            factor *= self.params.scale_factor;
        }
        hits
    }
}

fn scan_step(factor: f64) -> u32 {
    if factor >= 2.0 {
        1
    } else {
        2
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&self, image: &GrayImage) -> Result<Vec<Rect>, VisionError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VisionError::InvalidInput("empty image".into()));
        }
        let raw = self.detect_raw(image);
        let faces = group_rectangles(&raw, self.params.min_neighbors, GROUP_EPS);
        debug!(raw = raw.len(), faces = faces.len(), "cascade detection finished");
        Ok(faces)
    }
}
