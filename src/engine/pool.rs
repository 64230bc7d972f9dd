//! Model Pool Manager
//!
//! Loads one handle per model type on first use, shares it across requests
//! and unloads it after an idle timeout.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::{debug, info};

use super::registry::ModelType;
use super::runtime::{InferenceEngine, LoadedModel};

/// A loaded model with its last access time
struct CachedModel {
    model: Arc<dyn LoadedModel>,
    last_access: Instant,
}

/// Model Pool Manager with lazy loading and auto-unloading
pub struct ModelPool {
    engine: Arc<dyn InferenceEngine>,
    idle_timeout: Duration,
    models: RwLock<HashMap<ModelType, CachedModel>>,
    shutdown: Notify,
}

impl ModelPool {
    pub fn new(engine: Arc<dyn InferenceEngine>, idle_timeout: Duration) -> Self {
        Self {
            engine,
            idle_timeout,
            models: RwLock::new(HashMap::new()),
            shutdown: Notify::new(),
        }
    }

    /// Get or load the model serving `model_type`
    pub fn get_model(&self, model_type: ModelType, artifact_path: &Path) -> Result<Arc<dyn LoadedModel>> {
        {
            let mut models = self.models.write();
            if let Some(cached) = models.get_mut(&model_type) {
                cached.last_access = Instant::now();
                return Ok(cached.model.clone());
            }
        }

        // Load outside the map lock so other model types stay available
        info!("Loading model: {} from {}", model_type, artifact_path.display());
        let start = Instant::now();
        let model = self
            .engine
            .load(artifact_path)
            .with_context(|| format!("Failed to load model from {}", artifact_path.display()))?;
        info!("Model {} loaded in {:?}", model_type, start.elapsed());

        let mut models = self.models.write();
        // Another request may have finished loading first; keep its handle
        let cached = models.entry(model_type).or_insert(CachedModel {
            model,
            last_access: Instant::now(),
        });
        cached.last_access = Instant::now();
        Ok(cached.model.clone())
    }

    /// Check if a model is loaded
    pub fn is_loaded(&self, model_type: ModelType) -> bool {
        self.models.read().contains_key(&model_type)
    }

    /// Load status of the given model types
    pub fn get_status(&self, model_types: impl IntoIterator<Item = ModelType>) -> Vec<(ModelType, bool)> {
        model_types
            .into_iter()
            .map(|t| (t, self.is_loaded(t)))
            .collect()
    }

    /// Check and unload idle models
    fn cleanup_idle_models(&self) {
        let now = Instant::now();
        let mut models = self.models.write();
        models.retain(|model_type, cached| {
            let idle = now.duration_since(cached.last_access) > self.idle_timeout;
            if idle {
                info!("Unloading idle model: {}", model_type);
            }
            !idle
        });
    }

    /// Start the background cleanup task
    pub async fn start_cleanup_task(self: Arc<Self>) {
        let check_interval = Duration::from_secs(60);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(check_interval) => {
                    debug!("Running model cleanup check");
                    self.cleanup_idle_models();
                }
                _ = self.shutdown.notified() => {
                    info!("Model pool cleanup task shutting down");
                    break;
                }
            }
        }
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

impl Drop for ModelPool {
    fn drop(&mut self) {
        self.shutdown.notify_one();
    }
}
