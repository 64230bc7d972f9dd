//! Inference engine module
//!
//! Provides the pieces every inference request flows through:
//! - Model configuration lookup
//! - Image to tensor preprocessing
//! - Runtime abstraction with a lazily loading model pool
//! - Output decoding

pub mod decoder;
pub mod pool;
pub mod preprocess;
pub mod registry;
pub mod runtime;

#[cfg(feature = "openvino")]
pub mod openvino;

#[cfg(test)]
pub(crate) mod testing;

pub use decoder::{BoundingBox, ClassificationResult, DetectionResult, InferenceResult};
pub use pool::ModelPool;
pub use registry::{ModelConfig, ModelConfigRegistry, ModelType};
pub use runtime::{InferenceEngine, LoadedModel, NamedTensors, Tensor};
