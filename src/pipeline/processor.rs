use crate::config::TemplateConfig;
use crate::error::{ImageProcessError, ProcessError};
use crate::layers::{separate_layers, LayeredImagePair};
use crate::mask::{resize_mask, MaskRefiner};
use crate::segmentation::{ModelLoader, Preprocessor, SegmentationModel};
use image::GenericImageView;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Turns photos into subject/surroundings layer pairs.
///
/// Items are processed one at a time. Each item's decoded bitmap, model
/// tensors and masks are dropped before the next item is read, so peak
/// memory is bounded by one image regardless of batch size.
pub struct ImagesProcessor<L: ModelLoader> {
    loader: L,
    refiner: MaskRefiner,
}

impl<L: ModelLoader> ImagesProcessor<L> {
    pub fn new(loader: L, config: &TemplateConfig) -> Self {
        Self {
            loader,
            refiner: MaskRefiner::from_config(config),
        }
    }

    /// Separate every readable, segmentable image in `paths`, in order.
    ///
    /// Items that fail are logged and left out. The call only fails when
    /// the model cannot be loaded or when no item succeeds.
    pub fn process_images<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<LayeredImagePair>, ProcessError> {
        let mut model = self.loader.load().map_err(ProcessError::FailedToInitModel)?;
        let (input_width, input_height) = model.input_size();
        let preprocessor = Preprocessor::new(input_width.min(input_height));

        tracing::info!("Processing {} images", paths.len());

        let mut layers = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let started = Instant::now();
            match self.process_image(path, model.as_mut(), &preprocessor) {
                Ok(pair) => {
                    tracing::debug!(
                        "Separated {} in {:.1}ms",
                        path.display(),
                        started.elapsed().as_secs_f64() * 1000.0
                    );
                    layers.push(pair);
                }
                Err(err) => {
                    tracing::warn!("Skipping {}: {:#}", path.display(), anyhow::Error::from(err));
                }
            }
        }

        if layers.is_empty() {
            return Err(ProcessError::FailedToProcessImages {
                attempted: paths.len(),
            });
        }

        tracing::info!("Separated {} of {} images", layers.len(), paths.len());
        Ok(layers)
    }

    fn process_image(
        &self,
        path: &Path,
        model: &mut dyn SegmentationModel,
        preprocessor: &Preprocessor,
    ) -> Result<LayeredImagePair, ImageProcessError> {
        let _span = tracing::debug_span!("process_image", path = %path.display()).entered();

        let image = image::open(path).map_err(|source| ImageProcessError::FailedToGetImage {
            path: PathBuf::from(path),
            source,
        })?;
        let (width, height) = image.dimensions();

        let (input, placement) = preprocessor.letterbox(&image.to_rgb8());
        let raw_mask = model
            .segment(&input)
            .map_err(ImageProcessError::FailedToSegmentImage)?;
        drop(input);

        let refined = self.refiner.refine(raw_mask);
        let mask = resize_mask(&refined, &placement, width, height);
        drop(refined);

        separate_layers(&image, &mask)
    }
}
