//! The "before / subject / surroundings" template.
//!
//! The first photo opens the video untouched. Every other photo is split
//! into its subject and its surroundings, which follow in input order:
//!
//! ```text
//! [first, fg(1), bg(1), fg(2), bg(2), ...]
//! ```
//!
//! The frames are encoded and the bundled audio track is muxed underneath.

use crate::config::TemplateConfig;
use crate::error::{ComposeError, TemplateError};
use crate::layers::LayeredImagePair;
use crate::pipeline::ImagesProcessor;
use crate::segmentation::ModelLoader;
use crate::video::{ComposeSession, VideoComposer};
use anyhow::Context;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// `[first]` followed by each pair's foreground then background.
pub fn ordered_frames(first: RgbaImage, pairs: Vec<LayeredImagePair>) -> Vec<RgbaImage> {
    let mut frames = Vec::with_capacity(1 + 2 * pairs.len());
    frames.push(first);
    for pair in pairs {
        frames.push(pair.foreground);
        frames.push(pair.background);
    }
    frames
}

pub struct TemplateController<L: ModelLoader> {
    processor: ImagesProcessor<L>,
    composer: VideoComposer,
    audio: Option<PathBuf>,
}

impl<L: ModelLoader> TemplateController<L> {
    pub fn new(loader: L, config: TemplateConfig, audio: Option<PathBuf>) -> Self {
        Self {
            processor: ImagesProcessor::new(loader, &config),
            composer: VideoComposer::new(config),
            audio,
        }
    }

    /// Render the template for `image_paths` and return the final video.
    ///
    /// Blocks until the video is written. Only one application per working
    /// directory may run at a time; a concurrent call gets
    /// [`TemplateError::Busy`] right away.
    pub fn apply_template<P: AsRef<Path>>(&self, image_paths: &[P]) -> Result<PathBuf, TemplateError> {
        let session = self.composer.acquire().map_err(|err| match err {
            ComposeError::Busy(_) => TemplateError::Busy,
            other => TemplateError::FailedToCreateVideo(other.into()),
        })?;

        let started = Instant::now();
        match self.render(&session, image_paths) {
            Ok(path) => {
                tracing::info!(
                    "Template applied in {:.1}s: {}",
                    started.elapsed().as_secs_f64(),
                    path.display()
                );
                Ok(path)
            }
            Err(err) => {
                tracing::error!("Template failed: {:#}", err);
                Err(TemplateError::FailedToCreateVideo(err))
            }
        }
    }

    fn render<P: AsRef<Path>>(&self, session: &ComposeSession<'_>, image_paths: &[P]) -> anyhow::Result<PathBuf> {
        let (first, rest) = image_paths.split_first().context("no images supplied")?;
        let first = first.as_ref();

        let first_image = image::open(first)
            .with_context(|| format!("failed to read first image {}", first.display()))?
            .to_rgba8();

        let pairs = self.processor.process_images(rest)?;
        let frames = ordered_frames(first_image, pairs);
        tracing::info!("Composing {} frames", frames.len());

        let video = session.compose_video(&frames, self.audio.as_deref())?;
        tracing::info!(
            "Video is {:.2}s long, {}",
            video.duration,
            if video.has_audio { "with audio" } else { "silent" }
        );
        Ok(video.path)
    }
}
