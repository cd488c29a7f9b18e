use std::path::Path;

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;

use crate::grouping::Rect;
use crate::VisionError;

pub fn load_grayscale<P: AsRef<Path>>(path: P) -> Result<GrayImage, VisionError> {
    Ok(image::open(path.as_ref())?.to_luma8())
}

/// Crops `rect` out of `image`, clipped to the image bounds.
pub fn crop(image: &GrayImage, rect: Rect) -> Result<GrayImage, VisionError> {
    let (width, height) = image.dimensions();
    let x0 = rect.x.clamp(0, width as i32) as u32;
    let y0 = rect.y.clamp(0, height as i32) as u32;
    let x1 = (rect.x.saturating_add(rect.width)).clamp(0, width as i32) as u32;
    let y1 = (rect.y.saturating_add(rect.height)).clamp(0, height as i32) as u32;
    if x1 <= x0 || y1 <= y0 {
        return Err(VisionError::InvalidInput(format!(
            "face box {rect:?} does not overlap a {width}x{height} image"
        )));
    }
    Ok(imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image())
}

/// Resizes to `size`×`size` and scales pixels to `[0, 1]`, shaped
/// `(1, size, size, 1)`.
pub fn face_tensor(face: &GrayImage, size: u32) -> Result<Array4<f32>, VisionError> {
    if face.width() == 0 || face.height() == 0 {
        return Err(VisionError::InvalidInput("cannot resize an empty image".into()));
    }
    if size == 0 {
        return Err(VisionError::InvalidInput("target size must be positive".into()));
    }
    let resized = if face.dimensions() == (size, size) {
        face.clone()
    } else {
        imageops::resize(face, size, size, FilterType::Triangle)
    };
    let side = size as usize;
    Ok(Array4::from_shape_fn((1, side, side, 1), |(_, y, x, _)| {
        resized.get_pixel(x as u32, y as u32)[0] as f32 / 255.0
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Luma;

    #[test]
    fn crop_clips_to_bounds() {
        let image = GrayImage::from_fn(10, 10, |x, y| Luma([(x + y * 10) as u8]));
        let face = crop(&image, Rect::new(6, 7, 10, 10)).unwrap();
        assert_eq!(face.dimensions(), (4, 3));
        assert_eq!(face.get_pixel(0, 0)[0], 76);
    }

    #[test]
    fn crop_outside_image_fails() {
        let image = GrayImage::new(10, 10);
        assert!(crop(&image, Rect::new(20, 20, 5, 5)).is_err());
    }

    #[test]
    fn tensor_is_normalized_and_shaped() {
        let image = GrayImage::from_pixel(96, 64, Luma([255]));
        let tensor = face_tensor(&image, 48).unwrap();
        assert_eq!(tensor.dim(), (1, 48, 48, 1));
        for value in tensor.iter() {
            assert_abs_diff_eq!(*value, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn matching_size_keeps_pixels() {
        let image = GrayImage::from_fn(48, 48, |x, _| Luma([if x == 0 { 51 } else { 0 }]));
        let tensor = face_tensor(&image, 48).unwrap();
        assert_abs_diff_eq!(tensor[[0, 5, 0, 0]], 0.2, epsilon = 1e-6);
        assert_eq!(tensor[[0, 5, 1, 0]], 0.0);
    }

    #[test]
    fn loads_png_as_grayscale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        GrayImage::from_pixel(20, 30, Luma([128])).save(&path).unwrap();
        let loaded = load_grayscale(&path).unwrap();
        assert_eq!(loaded.dimensions(), (20, 30));
        assert!(load_grayscale(dir.path().join("missing.png")).is_err());
    }
}
