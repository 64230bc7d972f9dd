//! Inference runtime abstraction
//!
//! The pipeline only needs two capabilities from a runtime: load an artifact
//! into a handle, and run a forward pass over named tensors. Concrete
//! runtimes live behind these traits so they can be swapped freely.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use ndarray::ArrayD;

/// Dense `f32` tensor exchanged with the runtime
pub type Tensor = ArrayD<f32>;

/// Tensors keyed by the model's input or output names
pub type NamedTensors = HashMap<String, Tensor>;

/// A model loaded into the runtime.
///
/// Implementations must tolerate concurrent `run` calls; one handle is shared
/// by every request for its model type.
pub trait LoadedModel: Send + Sync {
    fn run(&self, inputs: &NamedTensors) -> Result<NamedTensors>;
}

/// Loads inference artifacts
pub trait InferenceEngine: Send + Sync {
    fn load(&self, artifact_path: &Path) -> Result<Arc<dyn LoadedModel>>;
}
