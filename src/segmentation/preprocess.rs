use anyhow::{ensure, Result};
use image::{imageops, Rgb, RgbImage};
use ndarray::Array4;

/// Placement of an image inside the model's square canvas.
///
/// The image is scaled uniformly so its longer side spans the canvas,
/// anchored at the top-left corner. The rest of the canvas is black.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Side of the square canvas
    pub canvas: u32,
    /// Canvas pixels per source pixel
    pub scale: f64,
    /// Width of the scaled image content inside the canvas
    pub content_width: u32,
    /// Height of the scaled image content inside the canvas
    pub content_height: u32,
}

impl Letterbox {
    pub fn new(source_width: u32, source_height: u32, canvas: u32) -> Self {
        let scale = fit_scale(source_width, source_height, canvas);
        Self {
            canvas,
            scale,
            content_width: scaled_side(source_width, scale, canvas),
            content_height: scaled_side(source_height, scale, canvas),
        }
    }
}

/// Scale that maps the longer of `width`/`height` onto `target`
fn fit_scale(width: u32, height: u32, target: u32) -> f64 {
    let longer = width.max(height).max(1);
    f64::from(target) / f64::from(longer)
}

fn scaled_side(side: u32, scale: f64, limit: u32) -> u32 {
    ((f64::from(side) * scale).round() as u32).clamp(1, limit.max(1))
}

/// Preprocessor for converting RGB images to model input tensors
pub struct Preprocessor {
    canvas: u32,
}

impl Preprocessor {
    pub fn new(canvas: u32) -> Self {
        Self { canvas }
    }

    /// Letterbox an image into the model's square canvas
    ///
    /// Already correctly sized square inputs are returned unchanged.
    pub fn letterbox(&self, image: &RgbImage) -> (RgbImage, Letterbox) {
        let _span = tracing::debug_span!("letterbox").entered();

        let (width, height) = image.dimensions();
        let placement = Letterbox::new(width, height, self.canvas);

        if (width, height) == (self.canvas, self.canvas) {
            return (image.clone(), placement);
        }

        let resized = imageops::resize(
            image,
            placement.content_width,
            placement.content_height,
            imageops::FilterType::Triangle,
        );

        let mut canvas = RgbImage::from_pixel(self.canvas, self.canvas, Rgb([0, 0, 0]));
        imageops::replace(&mut canvas, &resized, 0, 0);

        (canvas, placement)
    }

    /// Convert an RGB image into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Convert to float and normalize to [0, 1]
    /// 2. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn to_tensor(&self, image: &RgbImage) -> Result<Array4<f32>> {
        let _span = tracing::debug_span!("to_tensor").entered();

        let (width, height) = image.dimensions();
        ensure!(
            (width, height) == (self.canvas, self.canvas),
            "tensor input must be {0}x{0}, got {1}x{2}",
            self.canvas,
            width,
            height
        );

        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in image.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            tensor[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
            tensor[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
            tensor[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
        }

        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_fills_width_and_pads_bottom() {
        let image = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        let (boxed, placement) = Preprocessor::new(64).letterbox(&image);

        assert_eq!(boxed.dimensions(), (64, 64));
        assert_eq!((placement.content_width, placement.content_height), (64, 32));
        assert_eq!(boxed.get_pixel(10, 10), &Rgb([255, 255, 255]));
        assert_eq!(boxed.get_pixel(10, 50), &Rgb([0, 0, 0]));
    }

    #[test]
    fn portrait_fills_height_and_pads_right() {
        let image = RgbImage::from_pixel(30, 120, Rgb([200, 10, 10]));
        let (boxed, placement) = Preprocessor::new(64).letterbox(&image);

        assert_eq!(boxed.dimensions(), (64, 64));
        assert_eq!((placement.content_width, placement.content_height), (16, 64));
        assert_eq!(boxed.get_pixel(40, 10), &Rgb([0, 0, 0]));
    }

    #[test]
    fn letterbox_is_identity_on_canvas_sized_input() {
        let image = RgbImage::from_fn(32, 32, |x, y| Rgb([x as u8, y as u8, 7]));
        let (boxed, placement) = Preprocessor::new(32).letterbox(&image);

        assert_eq!(boxed, image);
        assert!((placement.scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn letterbox_always_yields_canvas_size() {
        let preprocessor = Preprocessor::new(48);
        for (w, h) in [(1, 1), (1, 300), (300, 1), (47, 49), (1000, 999)] {
            let (boxed, _) = preprocessor.letterbox(&RgbImage::new(w, h));
            assert_eq!(boxed.dimensions(), (48, 48), "input {w}x{h}");
        }
    }

    #[test]
    fn tensor_is_nchw_and_normalized() {
        let mut image = RgbImage::new(4, 4);
        image.put_pixel(1, 2, Rgb([255, 0, 51]));

        let tensor = Preprocessor::new(4).to_tensor(&image).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 4, 4]);
        assert!((tensor[[0, 0, 2, 1]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 2, 1]] - 0.2).abs() < 1e-6);
        assert_eq!(tensor[[0, 1, 2, 1]], 0.0);
    }

    #[test]
    fn tensor_rejects_wrong_size() {
        assert!(Preprocessor::new(8).to_tensor(&RgbImage::new(4, 4)).is_err());
    }
}
