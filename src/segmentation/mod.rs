mod onnx;
mod preprocess;
pub mod types;

pub use onnx::{OnnxModelLoader, OnnxSegmenter};
pub use preprocess::{Letterbox, Preprocessor};
pub use types::{ModelLoader, SegmentationModel};
