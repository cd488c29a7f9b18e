use image::GrayImage;

/// Summed-area tables of pixel values and squared pixel values.
///
/// Both tables have one extra leading row and column of zeros, so entry
/// `(x, y)` holds the sum over `[0, x) × [0, y)`.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    sum: Vec<f64>,
    sqsum: Vec<f64>,
}

impl IntegralImage {
    pub fn new(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let stride = width as usize + 1;
        let mut sum = vec![0.0f64; stride * (height as usize + 1)];
        let mut sqsum = vec![0.0f64; sum.len()];
        for y in 0..height as usize {
            let mut row_sum = 0.0;
            let mut row_sqsum = 0.0;
            for x in 0..width as usize {
                let value = image.get_pixel(x as u32, y as u32)[0] as f64;
                row_sum += value;
                row_sqsum += value * value;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sqsum[idx] = sqsum[idx - stride] + row_sqsum;
            }
        }
        Self {
            width,
            sum,
            sqsum,
        }
    }

    fn area(table: &[f64], stride: usize, x: u32, y: u32, w: u32, h: u32) -> f64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        table[y1 * stride + x1] - table[y0 * stride + x1] - table[y1 * stride + x0]
            + table[y0 * stride + x0]
    }

    /// Sum of pixels in the rectangle. Callers keep it inside the image.
    pub fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        Self::area(&self.sum, self.width as usize + 1, x, y, w, h)
    }

    pub fn rect_sqsum(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        Self::area(&self.sqsum, self.width as usize + 1, x, y, w, h)
    }
}
