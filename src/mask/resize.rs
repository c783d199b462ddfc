use super::Mask;
use crate::segmentation::Letterbox;
use image::imageops;

/// Map a mask from the model's letterboxed canvas back onto the original
/// image.
///
/// The content region recorded in `placement` is cropped from the top-left
/// corner, then stretched to exactly `width` x `height`. Masks smaller or
/// larger than the canvas are handled by scaling the region to the mask.
pub fn resize_mask(mask: &Mask, placement: &Letterbox, width: u32, height: u32) -> Mask {
    let _span = tracing::debug_span!("resize_mask").entered();

    let (mask_width, mask_height) = mask.dimensions();
    let (width, height) = (width.max(1), height.max(1));

    if mask_width == 0 || mask_height == 0 {
        return Mask::new(width, height);
    }

    let canvas = f64::from(placement.canvas.max(1));
    let crop = |content: u32, side: u32| {
        ((f64::from(content) * f64::from(side) / canvas).round() as u32).clamp(1, side)
    };
    let crop_width = crop(placement.content_width, mask_width);
    let crop_height = crop(placement.content_height, mask_height);

    let cropped = imageops::crop_imm(mask, 0, 0, crop_width, crop_height).to_image();
    if cropped.dimensions() == (width, height) {
        return cropped;
    }

    let mut resized = imageops::resize(&cropped, width, height, imageops::FilterType::Triangle);
    for pixel in resized.pixels_mut() {
        pixel[0] = pixel[0].clamp(0.0, 1.0);
    }
    resized
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn resize(mask: &Mask, width: u32, height: u32) -> Mask {
        resize_mask(mask, &Letterbox::new(width, height, 64), width, height)
    }

    #[test]
    fn output_matches_original_dimensions() {
        let mask = Mask::from_pixel(64, 64, Luma([0.5]));
        for (w, h) in [(200, 100), (100, 200), (64, 64), (1, 1), (3001, 17)] {
            assert_eq!(resize(&mask, w, h).dimensions(), (w, h));
        }
    }

    #[test]
    fn padding_is_cropped_away() {
        // Landscape 2:1 content occupies the top half of the canvas; the
        // padded bottom half is marked with 1.0 and must not leak in.
        let mask = Mask::from_fn(64, 64, |_, y| Luma([if y < 32 { 0.0 } else { 1.0 }]));
        let resized = resize(&mask, 128, 64);

        assert!(resized.pixels().all(|p| p[0] < 0.05));
    }

    #[test]
    fn content_position_is_preserved() {
        // Portrait 1:2 content occupies the left half; subject on its left side.
        let mask = Mask::from_fn(64, 64, |x, _| Luma([if x < 16 { 1.0 } else { 0.0 }]));
        let resized = resize(&mask, 50, 100);

        assert!(resized.get_pixel(2, 50)[0] > 0.95);
        assert!(resized.get_pixel(47, 50)[0] < 0.05);
    }

    #[test]
    fn letterbox_placement_is_honoured_on_smaller_masks() {
        let (_, placement) = crate::segmentation::Preprocessor::new(64).letterbox(&image::RgbImage::new(50, 100));
        // Content spans x < 32 on the canvas, x < 16 on a half-size mask.
        let mask = Mask::from_fn(32, 32, |x, _| Luma([if x < 8 { 1.0 } else { 0.0 }]));
        let resized = resize_mask(&mask, &placement, 50, 100);

        assert!(resized.get_pixel(2, 50)[0] > 0.95);
        assert!(resized.get_pixel(47, 50)[0] < 0.05);
    }

    #[test]
    fn works_with_smaller_model_output() {
        // Model output at half of the input canvas still maps back cleanly.
        let mask = Mask::from_pixel(32, 32, Luma([1.0]));
        let resized = resize(&mask, 300, 200);
        assert_eq!(resized.dimensions(), (300, 200));
        assert!(resized.pixels().all(|p| (p[0] - 1.0).abs() < 1e-4));
    }
}
