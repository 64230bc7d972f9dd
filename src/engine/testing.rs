//! Scripted engine used by pipeline tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ndarray::{ArrayD, Axis, IxDyn};
use parking_lot::Mutex;

use super::runtime::{InferenceEngine, LoadedModel, NamedTensors, Tensor};

/// Build a 1-d tensor from values
pub fn tensor(values: &[f32]) -> Tensor {
    ArrayD::from_shape_vec(IxDyn(&[values.len()]), values.to_vec()).unwrap()
}

/// Engine returning canned outputs per artifact path
#[derive(Default)]
pub struct ScriptedEngine {
    outputs: Mutex<HashMap<PathBuf, std::result::Result<NamedTensors, String>>>,
    delays: Mutex<HashMap<PathBuf, Duration>>,
    /// Input shapes seen per artifact, in call order
    pub seen_inputs: Arc<Mutex<Vec<(PathBuf, Vec<usize>)>>>,
    /// Mean of channel 0 (red) of each input, in call order
    pub seen_red_means: Arc<Mutex<Vec<(PathBuf, f32)>>>,
    pub loads: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, artifact: &str, outputs: &[(&str, Tensor)]) {
        let named = outputs
            .iter()
            .map(|(name, t)| (name.to_string(), t.clone()))
            .collect();
        self.outputs.lock().insert(PathBuf::from(artifact), Ok(named));
    }

    pub fn fail(&self, artifact: &str, message: &str) {
        self.outputs
            .lock()
            .insert(PathBuf::from(artifact), Err(message.to_string()));
    }

    /// Block every run of `artifact` for `delay`. Set before the first load.
    pub fn delay(&self, artifact: &str, delay: Duration) {
        self.delays.lock().insert(PathBuf::from(artifact), delay);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

struct ScriptedModel {
    path: PathBuf,
    outputs: std::result::Result<NamedTensors, String>,
    delay: Option<Duration>,
    seen_inputs: Arc<Mutex<Vec<(PathBuf, Vec<usize>)>>>,
    seen_red_means: Arc<Mutex<Vec<(PathBuf, f32)>>>,
}

impl LoadedModel for ScriptedModel {
    fn run(&self, inputs: &NamedTensors) -> Result<NamedTensors> {
        for tensor in inputs.values() {
            self.seen_inputs
                .lock()
                .push((self.path.clone(), tensor.shape().to_vec()));
            if let Some(red) = tensor.index_axis(Axis(0), 0).mean() {
                self.seen_red_means.lock().push((self.path.clone(), red));
            }
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.outputs.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

impl InferenceEngine for ScriptedEngine {
    fn load(&self, artifact_path: &Path) -> Result<Arc<dyn LoadedModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let outputs = self
            .outputs
            .lock()
            .get(artifact_path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No such artifact: {}", artifact_path.display()))?;

        Ok(Arc::new(ScriptedModel {
            path: artifact_path.to_path_buf(),
            outputs,
            delay: self.delays.lock().get(artifact_path).copied(),
            seen_inputs: self.seen_inputs.clone(),
            seen_red_means: self.seen_red_means.clone(),
        }))
    }
}
