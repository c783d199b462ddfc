mod separate;

pub use separate::{blend_with_mask, separate_background, separate_foreground, separate_layers};

use image::RgbaImage;

/// Subject and surroundings cut from one photo. Both layers have the
/// photo's pixel dimensions; regions outside each layer are transparent.
#[derive(Debug, Clone)]
pub struct LayeredImagePair {
    pub foreground: RgbaImage,
    pub background: RgbaImage,
}
