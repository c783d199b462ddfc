mod refine;
mod resize;

pub use refine::{contrast, exposure, refine_mask, white_point, MaskFilter, MaskRefiner};
pub use resize::resize_mask;

use image::{ImageBuffer, Luma};

/// Single-channel subject mask: 0.0 = background, 1.0 = subject
pub type Mask = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Pixel-wise `1 - mask`
pub fn invert(mask: &Mask) -> Mask {
    Mask::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([1.0 - mask.get_pixel(x, y)[0].clamp(0.0, 1.0)])
    })
}
