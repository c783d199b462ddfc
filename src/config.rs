use std::path::{Path, PathBuf};

/// Fixed parameters of the single template this crate renders.
///
/// Nothing here is meant to be tuned per run; the binary only swaps the
/// working directory. Tests shrink sizes to keep fixtures small.
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    /// Side of the square canvas the segmentation model expects
    pub model_input_size: u32,

    /// Output frame rate
    pub fps: u32,

    /// How long each source image stays on screen, in seconds
    pub image_duration: f64,

    /// Exposure boost applied to raw masks, in EV
    pub mask_exposure_ev: f32,

    /// Contrast multiplier applied around mid-gray after the exposure boost
    pub mask_contrast: f32,

    /// Frames the encoder may buffer before the sequencer has to wait
    pub encoder_queue_depth: usize,

    /// AAC bitrate of the muxed audio track
    pub audio_bitrate: String,

    /// Directory holding the reused intermediate and output videos
    pub work_dir: PathBuf,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            model_input_size: 1024,
            fps: 30,
            image_duration: 0.5,
            mask_exposure_ev: 1.0,
            mask_contrast: 1.5,
            encoder_queue_depth: 4,
            audio_bitrate: "256k".to_string(),
            work_dir: std::env::temp_dir(),
        }
    }
}

impl TemplateConfig {
    const SILENT_VIDEO_NAME: &'static str = "empty.mov";
    const OUTPUT_VIDEO_NAME: &'static str = "output.mov";

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn silent_video_path(&self) -> PathBuf {
        self.work_dir.join(Self::SILENT_VIDEO_NAME)
    }

    pub fn output_video_path(&self) -> PathBuf {
        self.work_dir.join(Self::OUTPUT_VIDEO_NAME)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_paths_live_in_work_dir() {
        let config = TemplateConfig::default().with_work_dir("/tmp/reel");
        assert_eq!(config.silent_video_path(), PathBuf::from("/tmp/reel/empty.mov"));
        assert_eq!(config.output_video_path(), PathBuf::from("/tmp/reel/output.mov"));
    }

    #[test]
    fn defaults_match_template() {
        let config = TemplateConfig::default();
        assert_eq!(config.model_input_size, 1024);
        assert_eq!(config.fps, 30);
        assert!((config.image_duration - 0.5).abs() < f64::EPSILON);
    }
}
