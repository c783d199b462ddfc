use super::{FrameSink, FrameTimeline};
use crate::error::ComposeError;
use image::{imageops, Rgba, RgbaImage};
use std::sync::Arc;

/// Source-over for straight (non-premultiplied) RGBA8
fn over(dst: &mut Rgba<u8>, src: &Rgba<u8>) {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return;
    }
    if sa == 255 {
        *dst = *src;
        return;
    }

    let inv = 255 - sa;
    let da = u32::from(dst[3]);
    // Output alpha scaled by 255.
    let out_a = sa * 255 + da * inv;

    for c in 0..3 {
        let num = u32::from(src[c]) * sa * 255 + u32::from(dst[c]) * da * inv;
        dst[c] = ((num + out_a / 2) / out_a) as u8;
    }
    dst[3] = ((out_a + 127) / 255) as u8;
}

/// Draw `image` over `canvas`, stretched to the canvas size.
fn draw_over(canvas: &mut RgbaImage, image: &RgbaImage) {
    let scaled;
    let image = if image.dimensions() == canvas.dimensions() {
        image
    } else {
        let (width, height) = canvas.dimensions();
        scaled = imageops::resize(image, width, height, imageops::FilterType::Triangle);
        &scaled
    };

    for (dst, src) in canvas.pixels_mut().zip(image.pixels()) {
        over(dst, src);
    }
}

/// Walk the timeline and push one frame per tick into `sink`.
///
/// The frame buffer starts opaque black with the first image drawn on it.
/// Whenever the timeline moves to another image, that image is drawn over
/// the current frame, so transparent parts of a layer keep showing what
/// was there before. Frames between image changes share one buffer.
///
/// Returns the number of frames appended.
pub fn render_frames<S: FrameSink>(
    images: &[RgbaImage],
    timeline: &FrameTimeline,
    sink: &mut S,
) -> Result<u64, ComposeError> {
    let _span = tracing::debug_span!("render_frames").entered();

    let first = images.first().ok_or(ComposeError::NoImages)?;
    let (width, height) = sink.resolution();

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    draw_over(&mut canvas, first);
    let mut frame = Arc::new(canvas);
    let mut shown = 0usize;

    let total = timeline.total_frames();
    tracing::debug!("Rendering {} frames from {} images", total, images.len());

    for pts in 0..total {
        let index = timeline.image_index(pts);
        if index != shown {
            if let Some(image) = images.get(index) {
                // Copies only if the sink still holds the previous frame.
                draw_over(Arc::make_mut(&mut frame), image);
            }
            shown = index;
        }
        sink.append_frame(Arc::clone(&frame), pts)?;
    }

    Ok(total)
}
