use crate::mask::Mask;
use anyhow::Result;
use image::RgbImage;

/// Trait for segmentation models
/// Allows swapping the ONNX backend for a deterministic fake in tests
pub trait SegmentationModel {
    /// Run one forward pass over a letterboxed image
    ///
    /// # Arguments
    /// * `image` - RGB image already sized to [`SegmentationModel::input_size`]
    ///
    /// # Returns
    /// * Subject mask at the model's native output resolution, values 0.0-1.0
    fn segment(&mut self, image: &RgbImage) -> Result<Mask>;

    /// Get the model's expected input dimensions
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);
}

/// Loads a segmentation model. Loading happens once per batch, before any
/// image is touched, so a broken model fails the whole run up front.
pub trait ModelLoader {
    fn load(&self) -> Result<Box<dyn SegmentationModel>>;
}
