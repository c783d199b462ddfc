//! Turns a handful of portrait photos into a short music video.
//!
//! Each photo is cut into its subject and its surroundings by an on-device
//! segmentation model. The layers are sequenced into frames, encoded, and
//! an audio track is muxed underneath.
//!
//! Pipeline, leaf first:
//! 1. [`segmentation`]: letterbox to the model canvas and infer a mask
//! 2. [`mask`]: refine the raw mask and map it back to the photo
//! 3. [`layers`]: blend the photo with the mask into two layers
//! 4. [`pipeline`]: run the above per photo, skipping the ones that fail
//! 5. [`video`]: sequence frames, encode with ffmpeg, mux audio
//! 6. [`template`]: put it all together
//!
//! Encoding and muxing shell out to the system `ffmpeg`/`ffprobe`.

pub mod config;
pub mod error;
pub mod layers;
pub mod mask;
pub mod pipeline;
pub mod segmentation;
pub mod template;
pub mod video;

pub use config::TemplateConfig;
pub use error::{ComposeError, ImageProcessError, ProcessError, TemplateError};
pub use layers::LayeredImagePair;
pub use mask::Mask;
pub use pipeline::ImagesProcessor;
pub use segmentation::{ModelLoader, OnnxModelLoader, SegmentationModel};
pub use template::TemplateController;
pub use video::{VideoAsset, VideoComposer};
