use super::LayeredImagePair;
use crate::error::ImageProcessError;
use crate::mask::{self, Mask};
use image::{DynamicImage, Rgba, RgbaImage};

/// Mask-weighted mix of two images: `image` where the mask is 1,
/// `background` where it is 0, linear in between. All channels including
/// alpha are mixed.
///
/// Returns `None` when the three inputs disagree on dimensions.
pub fn blend_with_mask(image: &RgbaImage, background: &RgbaImage, mask: &Mask) -> Option<RgbaImage> {
    let dims = image.dimensions();
    if background.dimensions() != dims || mask.dimensions() != dims {
        return None;
    }

    let mut out = RgbaImage::new(dims.0, dims.1);
    for (((dst, fg), bg), weight) in out
        .pixels_mut()
        .zip(image.pixels())
        .zip(background.pixels())
        .zip(mask.pixels())
    {
        let m = weight[0];
        if !m.is_finite() {
            return None;
        }
        let m = m.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 * m + b as f32 * (1.0 - m)).round().clamp(0.0, 255.0) as u8;
        *dst = Rgba([
            mix(fg[0], bg[0]),
            mix(fg[1], bg[1]),
            mix(fg[2], bg[2]),
            mix(fg[3], bg[3]),
        ]);
    }
    Some(out)
}

/// Same colors, zero alpha everywhere
fn transparent_copy(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel[3] = 0;
    }
    out
}

/// Keep the image where the mask is set; everything else turns transparent.
pub fn separate_foreground(image: &RgbaImage, mask: &Mask) -> Result<RgbaImage, ImageProcessError> {
    blend_with_mask(image, &transparent_copy(image), mask)
        .ok_or_else(|| ImageProcessError::separate("foreground blend produced no output"))
}

/// Keep the image where the mask is clear; the subject turns transparent.
pub fn separate_background(image: &RgbaImage, mask: &Mask) -> Result<RgbaImage, ImageProcessError> {
    let inverted = mask::invert(mask);
    blend_with_mask(image, &transparent_copy(image), &inverted)
        .ok_or_else(|| ImageProcessError::separate("background blend produced no output"))
}

/// Split a photo into subject and surroundings using a full-resolution mask.
pub fn separate_layers(image: &DynamicImage, mask: &Mask) -> Result<LayeredImagePair, ImageProcessError> {
    let _span = tracing::debug_span!("separate_layers").entered();

    let rgba = image.to_rgba8();
    if rgba.dimensions() != mask.dimensions() {
        return Err(ImageProcessError::separate(format!(
            "mask is {}x{}, image is {}x{}",
            mask.width(),
            mask.height(),
            rgba.width(),
            rgba.height()
        )));
    }

    Ok(LayeredImagePair {
        foreground: separate_foreground(&rgba, mask)?,
        background: separate_background(&rgba, mask)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage};

    fn photo(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8 * 10, y as u8 * 10, 99, 255]))
    }

    fn checkerboard(width: u32, height: u32) -> Mask {
        Mask::from_fn(width, height, |x, y| Luma([((x + y) % 2) as f32]))
    }

    #[test]
    fn binary_mask_layers_cover_frame_exactly_once() {
        let image = photo(6, 4);
        let mask = checkerboard(6, 4);

        let fg = separate_foreground(&image, &mask).unwrap();
        let bg = separate_background(&image, &mask).unwrap();

        for ((f, b), original) in fg.pixels().zip(bg.pixels()).zip(image.pixels()) {
            assert_eq!(f[3] as u16 + b[3] as u16, 255);
            let visible = if f[3] == 255 { f } else { b };
            assert_eq!(&visible.0[..3], &original.0[..3]);
        }
    }

    #[test]
    fn partial_weights_split_alpha() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 200]));
        let mask = Mask::from_pixel(1, 1, Luma([0.25]));

        let fg = separate_foreground(&image, &mask).unwrap();
        let bg = separate_background(&image, &mask).unwrap();

        assert_eq!(fg.get_pixel(0, 0), &Rgba([10, 20, 30, 50]));
        assert_eq!(bg.get_pixel(0, 0), &Rgba([10, 20, 30, 150]));
    }

    #[test]
    fn layers_keep_image_dimensions() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(7, 3));
        let pair = separate_layers(&image, &Mask::new(7, 3)).unwrap();

        assert_eq!(pair.foreground.dimensions(), (7, 3));
        assert_eq!(pair.background.dimensions(), (7, 3));
        assert!(pair.foreground.pixels().all(|p| p[3] == 0));
        assert!(pair.background.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn mismatched_mask_fails_to_separate() {
        let image = DynamicImage::ImageRgba8(photo(4, 4));
        let err = separate_layers(&image, &Mask::new(4, 5)).unwrap_err();
        assert!(matches!(err, ImageProcessError::FailedToSeparateImage(_)));
    }

    #[test]
    fn non_finite_mask_has_no_blend_output() {
        let image = photo(2, 1);
        let mask = Mask::from_raw(2, 1, vec![0.5, f32::NAN]).unwrap();
        assert!(blend_with_mask(&image, &image, &mask).is_none());
    }
}
