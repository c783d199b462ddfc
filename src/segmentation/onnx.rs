use super::preprocess::Preprocessor;
use super::types::{ModelLoader, SegmentationModel};
use crate::mask::Mask;
use anyhow::{bail, Context, Result};
use image::{Luma, RgbImage};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use std::path::{Path, PathBuf};

/// Single-input, single-output portrait segmentation model run through
/// ONNX Runtime.
///
/// The model takes a `[1, 3, S, S]` RGB tensor normalized to [0, 1] and
/// produces a mask shaped `[1, C, H, W]`, `[1, H, W]` or `[H, W]`. Only
/// the first channel is used.
pub struct OnnxSegmenter {
    session: Session,
    preprocessor: Preprocessor,
    size: u32,
}

impl OnnxSegmenter {
    /// Create a new segmenter from an ONNX file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `input_size` - Side of the square input canvas the model was exported with
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading segmentation model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("Segmentation model loaded");

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(input_size),
            size: input_size,
        })
    }
}

impl SegmentationModel for OnnxSegmenter {
    fn segment(&mut self, image: &RgbImage) -> Result<Mask> {
        let _span = tracing::debug_span!("onnx_segment").entered();

        let tensor = self.preprocessor.to_tensor(image)?;
        let shape = tensor.shape().to_vec();
        let input: Value = Tensor::from_array((shape, tensor.into_raw_vec().into_boxed_slice()))
            .map(Value::from)
            .context("Failed to build input tensor")?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![input])
            .context("Failed to run inference")?;
        drop(_infer_span);

        // The mask is the first output; anything after it is ignored.
        let output = &outputs[0];

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            return mask_from_output(&dims, data.iter().copied());
        }

        let (shape, data) = output
            .try_extract_tensor::<u8>()
            .context("Mask output is neither f32 nor u8")?;
        let dims: Vec<i64> = shape.iter().copied().collect();
        mask_from_output(&dims, data.iter().map(|&v| v as f32 / 255.0))
    }

    fn input_size(&self) -> (u32, u32) {
        (self.size, self.size)
    }
}

/// Build a mask from the first channel of a model output tensor.
///
/// 8-bit style outputs (any value above 1.0) are rescaled from 0..255.
fn mask_from_output(dims: &[i64], values: impl Iterator<Item = f32>) -> Result<Mask> {
    let (height, width) = match dims {
        [h, w] | [1, h, w] | [1, _, h, w] => (*h, *w),
        _ => bail!("Unexpected mask output shape {:?}", dims),
    };
    if height <= 0 || width <= 0 {
        bail!("Empty mask output shape {:?}", dims);
    }

    let (width, height) = (width as u32, height as u32);
    let plane: Vec<f32> = values.take((width * height) as usize).collect();
    if plane.len() != (width * height) as usize {
        bail!("Mask output holds {} values, expected {}", plane.len(), width * height);
    }

    let peak = plane.iter().copied().fold(0.0f32, f32::max);
    let divisor = if peak > 1.0 { 255.0 } else { 1.0 };

    Ok(Mask::from_fn(width, height, |x, y| {
        let value = plane[(y * width + x) as usize] / divisor;
        Luma([value.clamp(0.0, 1.0)])
    }))
}

/// Loads [`OnnxSegmenter`] from a file on each call.
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    model_path: PathBuf,
    input_size: u32,
}

impl OnnxModelLoader {
    pub fn new(model_path: impl Into<PathBuf>, input_size: u32) -> Self {
        Self {
            model_path: model_path.into(),
            input_size,
        }
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self) -> Result<Box<dyn SegmentationModel>> {
        let model = OnnxSegmenter::new(&self.model_path, self.input_size)?;
        Ok(Box::new(model))
    }
}
