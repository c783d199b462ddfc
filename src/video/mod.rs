mod command;
mod composer;
mod encoder;
mod mux;
mod probe;
mod sequencer;
mod timeline;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand};
pub use composer::{ComposeSession, VideoComposer};
pub use encoder::{even_dimensions, EncodeConfig, FfmpegEncoder};
pub use mux::AudioMuxer;
pub use probe::{probe_media, AudioTrack, MediaInfo, VideoTrack};
pub use sequencer::render_frames;
pub use timeline::FrameTimeline;

use crate::error::ComposeError;
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::Arc;

/// Trait for frame destinations
pub trait FrameSink {
    /// Append the frame shown at `pts` (in frame units)
    ///
    /// Frames must arrive in order with no gaps. Implementations block
    /// while they cannot accept more data.
    fn append_frame(&mut self, frame: Arc<RgbaImage>, pts: u64) -> Result<(), ComposeError>;

    /// Get the expected frame resolution
    fn resolution(&self) -> (u32, u32);
}

/// A video written to disk by this crate.
#[derive(Debug, Clone)]
pub struct VideoAsset {
    pub path: PathBuf,
    /// Seconds
    pub duration: f64,
    pub has_audio: bool,
}
