/// Mapping from output frames to source images when every image is shown
/// for the same fixed duration.
///
/// A frame whose timestamp falls exactly on an image boundary belongs to
/// the incoming image: with 30 fps and 0.5 s per image, frames 0-14 show
/// image 0 and frame 15 is the first frame of image 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTimeline {
    fps: u32,
    image_duration: f64,
    image_count: usize,
}

// Absorbs float error so exact boundaries round to the incoming image.
const BOUNDARY_EPSILON: f64 = 1e-9;

impl FrameTimeline {
    pub fn new(fps: u32, image_duration: f64, image_count: usize) -> Self {
        Self {
            fps,
            image_duration,
            image_count,
        }
    }

    /// `round(fps * image_duration * image_count)`
    pub fn total_frames(&self) -> u64 {
        let frames = f64::from(self.fps) * self.image_duration * self.image_count as f64;
        if frames.is_finite() && frames > 0.0 {
            frames.round() as u64
        } else {
            0
        }
    }

    /// Seconds from the start of the video to `frame`
    pub fn frame_time(&self, frame: u64) -> f64 {
        frame as f64 / f64::from(self.fps.max(1))
    }

    /// Index of the image shown at `frame`, clamped to the last image
    pub fn image_index(&self, frame: u64) -> usize {
        if self.image_count == 0 || self.image_duration <= 0.0 {
            return 0;
        }
        let slot = (self.frame_time(frame) / self.image_duration + BOUNDARY_EPSILON).floor();
        (slot.max(0.0) as usize).min(self.image_count - 1)
    }

    /// Video duration in seconds
    pub fn duration(&self) -> f64 {
        self.frame_time(self.total_frames())
    }
}
