//! OpenVINO inference backend

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ndarray::{ArrayD, IxDyn};
use openvino::{CompiledModel, Core, ElementType, Shape, Tensor as OvTensor};
use parking_lot::Mutex;
use tracing::debug;

use super::runtime::{InferenceEngine, LoadedModel, NamedTensors};

/// Wrapper for OpenVINO Core that implements Send + Sync
struct SafeCore(Core);
unsafe impl Send for SafeCore {}
unsafe impl Sync for SafeCore {}

/// Wrapper for OpenVINO CompiledModel that implements Send + Sync
struct SafeCompiledModel(CompiledModel);
unsafe impl Send for SafeCompiledModel {}
unsafe impl Sync for SafeCompiledModel {}

/// Loads artifacts with OpenVINO on a fixed device
pub struct OpenVinoEngine {
    core: Mutex<SafeCore>,
    device: String,
}

impl OpenVinoEngine {
    pub fn new(device: &str) -> Result<Self> {
        let core = Core::new().context("Failed to initialize OpenVINO")?;
        Ok(Self {
            core: Mutex::new(SafeCore(core)),
            device: device.to_string(),
        })
    }
}

impl InferenceEngine for OpenVinoEngine {
    fn load(&self, artifact_path: &Path) -> Result<Arc<dyn LoadedModel>> {
        let path = artifact_path
            .to_str()
            .context("Model path is not valid UTF-8")?;

        // Core methods take &mut self in the Rust bindings
        let mut core = self.core.lock();
        let model = core.0.read_model_from_file(path, "")?;

        let mut output_names = Vec::new();
        for i in 0..model.get_outputs_len()? {
            output_names.push(model.get_output_by_index(i)?.get_name()?);
        }
        debug!("Model {} outputs: {:?}", path, output_names);

        let compiled = core.0.compile_model(&model, self.device.as_str().into())?;

        Ok(Arc::new(OpenVinoModel {
            compiled: Mutex::new(SafeCompiledModel(compiled)),
            output_names,
        }))
    }
}

struct OpenVinoModel {
    compiled: Mutex<SafeCompiledModel>,
    output_names: Vec<String>,
}

impl LoadedModel for OpenVinoModel {
    fn run(&self, inputs: &NamedTensors) -> Result<NamedTensors> {
        // Only request creation needs exclusive access; inference runs unlocked
        let mut request = self.compiled.lock().0.create_infer_request()?;

        for (name, tensor) in inputs {
            let dims: Vec<i64> = tensor.shape().iter().map(|d| *d as i64).collect();
            let mut input = OvTensor::new(ElementType::F32, &Shape::new(&dims)?)?;
            let data = input.get_data_mut::<f32>()?;
            for (dst, src) in data.iter_mut().zip(tensor.iter()) {
                *dst = *src;
            }
            request.set_tensor(name, &input)?;
        }

        request.infer()?;

        let mut outputs = NamedTensors::new();
        for name in &self.output_names {
            let tensor = request.get_tensor(name)?;
            let dims: Vec<usize> = tensor
                .get_shape()?
                .get_dimensions()
                .iter()
                .map(|d| *d as usize)
                .collect();
            let data = tensor.get_data::<f32>()?.to_vec();
            let array = ArrayD::from_shape_vec(IxDyn(&dims), data)
                .with_context(|| format!("Output '{}' does not match its shape", name))?;
            outputs.insert(name.clone(), array);
        }

        Ok(outputs)
    }
}
