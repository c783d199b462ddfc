mod processor;

pub use processor::ImagesProcessor;
