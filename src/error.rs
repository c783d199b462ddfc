use std::path::PathBuf;
use thiserror::Error;

/// Whole-batch failures of the image pipeline.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to initialize segmentation model")]
    FailedToInitModel(#[source] anyhow::Error),

    #[error("failed to process images: none of {attempted} inputs could be separated")]
    FailedToProcessImages { attempted: usize },
}

/// Failures of a single input image. These never leave the pipeline:
/// the item is logged and dropped from the batch.
#[derive(Debug, Error)]
pub enum ImageProcessError {
    #[error("failed to read image {path}")]
    FailedToGetImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to segment image")]
    FailedToSegmentImage(#[source] anyhow::Error),

    #[error("failed to separate image: {0}")]
    FailedToSeparateImage(String),
}

impl ImageProcessError {
    pub fn separate(message: impl Into<String>) -> Self {
        Self::FailedToSeparateImage(message.into())
    }
}

/// Failures while turning frames into the final video.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("no images to compose")]
    NoImages,

    #[error("another video is already being composed in {0}")]
    Busy(PathBuf),

    #[error("{0} not found in PATH")]
    ToolNotFound(&'static str),

    #[error("encoder error: {0}")]
    Encoder(String),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("failed to add audio: {0}")]
    FailedToAddAudio(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ComposeError {
    pub fn encoder(message: impl Into<String>) -> Self {
        Self::Encoder(message.into())
    }

    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe(message.into())
    }

    pub fn add_audio(message: impl Into<String>) -> Self {
        Self::FailedToAddAudio(message.into())
    }
}

/// The only errors a template caller sees. Which stage failed is kept
/// as the error source for logging, not as a separate variant.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("a template is already being applied")]
    Busy,

    #[error("failed to create video")]
    FailedToCreateVideo(#[source] anyhow::Error),
}
