use super::encoder::{even_dimensions, EncodeConfig, FfmpegEncoder};
use super::mux::AudioMuxer;
use super::sequencer::render_frames;
use super::{FrameTimeline, VideoAsset};
use crate::config::TemplateConfig;
use crate::error::ComposeError;
use image::RgbaImage;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

/// Working directories with a composition in progress, process-wide.
fn in_flight() -> &'static Mutex<HashSet<PathBuf>> {
    static IN_FLIGHT: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    IN_FLIGHT.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Canonical spelling of `work_dir`, creating it first so every spelling
/// of one directory maps to one key.
fn flight_key(work_dir: &Path) -> Result<PathBuf, ComposeError> {
    std::fs::create_dir_all(work_dir)?;
    Ok(std::fs::canonicalize(work_dir)?)
}

/// Builds the template video from an ordered list of frames.
///
/// The silent and muxed videos live at fixed paths inside the working
/// directory and are rebuilt from scratch on every run. Composing always
/// goes through [`VideoComposer::acquire`], which allows one composition
/// per working directory at a time.
#[derive(Debug, Clone)]
pub struct VideoComposer {
    config: TemplateConfig,
    muxer: AudioMuxer,
}

impl VideoComposer {
    pub fn new(config: TemplateConfig) -> Self {
        let muxer = AudioMuxer::new(config.audio_bitrate.clone());
        Self { config, muxer }
    }

    /// Reserve the working directory. Fails with [`ComposeError::Busy`]
    /// instead of waiting when another session holds it.
    pub fn acquire(&self) -> Result<ComposeSession<'_>, ComposeError> {
        let key = flight_key(self.config.work_dir())?;
        let mut active = in_flight().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !active.insert(key.clone()) {
            return Err(ComposeError::Busy(key));
        }
        tracing::debug!("Reserved {}", key.display());
        Ok(ComposeSession { composer: self, key })
    }
}

/// Exclusive use of a composer's working directory until dropped.
pub struct ComposeSession<'a> {
    composer: &'a VideoComposer,
    key: PathBuf,
}

impl ComposeSession<'_> {
    /// Encode `images` into a silent video, then mux `audio` under it when
    /// given. Without audio the silent video is the result.
    pub fn compose_video(&self, images: &[RgbaImage], audio: Option<&Path>) -> Result<VideoAsset, ComposeError> {
        let first = images.first().ok_or(ComposeError::NoImages)?;
        let config = &self.composer.config;
        std::fs::create_dir_all(config.work_dir())?;

        let (width, height) = even_dimensions(first.width(), first.height());
        let timeline = FrameTimeline::new(config.fps, config.image_duration, images.len());
        let silent_path = config.silent_video_path();

        let started = Instant::now();
        let mut encoder = FfmpegEncoder::new(EncodeConfig {
            width,
            height,
            fps: config.fps,
            out_path: silent_path.clone(),
            queue_depth: config.encoder_queue_depth,
        })?;
        render_frames(images, &timeline, &mut encoder)?;
        let frames = encoder.finish()?;

        tracing::info!(
            "Encoded {} frames ({:.2}s of video) in {:.1}ms",
            frames,
            timeline.duration(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        let silent = VideoAsset {
            path: silent_path,
            duration: timeline.duration(),
            has_audio: false,
        };

        match audio {
            Some(audio) => self
                .composer
                .muxer
                .add_audio(&silent.path, audio, &config.output_video_path()),
            None => Ok(silent),
        }
    }
}

impl Drop for ComposeSession<'_> {
    fn drop(&mut self) {
        let mut active = in_flight().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        active.remove(&self.key);
        tracing::debug!("Released {}", self.key.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer(dir: &Path) -> VideoComposer {
        VideoComposer::new(TemplateConfig::default().with_work_dir(dir))
    }

    #[test]
    fn second_session_on_same_dir_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let first = composer(dir.path());
        let second = composer(dir.path());

        let session = first.acquire().unwrap();
        assert!(matches!(second.acquire(), Err(ComposeError::Busy(_))));

        drop(session);
        assert!(second.acquire().is_ok());
    }

    #[test]
    fn spellings_of_one_missing_dir_share_a_session() {
        let root = tempfile::tempdir().unwrap();
        let roundabout = composer(&root.path().join("sub").join("..").join("work"));
        let direct = composer(&root.path().join("work"));

        let _session = roundabout.acquire().unwrap();
        assert!(root.path().join("work").is_dir());
        assert!(matches!(direct.acquire(), Err(ComposeError::Busy(_))));
    }

    #[test]
    fn unusable_work_dir_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("taken");
        std::fs::write(&file, b"not a dir").unwrap();

        assert!(matches!(composer(&file).acquire(), Err(ComposeError::Io(_))));
    }

    #[test]
    fn different_dirs_do_not_block_each_other() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let composer_a = composer(a.path());
        let composer_b = composer(b.path());

        let _session_a = composer_a.acquire().unwrap();
        assert!(composer_b.acquire().is_ok());
    }

    #[test]
    fn composing_nothing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let composer = composer(dir.path());
        let session = composer.acquire().unwrap();

        assert!(matches!(session.compose_video(&[], None), Err(ComposeError::NoImages)));
    }
}
