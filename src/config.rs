//! Service configuration
//!
//! Loaded once at startup from `config.toml` and passed explicitly to every
//! component that needs it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::registry::{BoxSpace, ModelConfig, ModelType, Normalization, OutputKind};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    #[serde(default)]
    pub models: BTreeMap<ModelType, ModelConfig>,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub rest_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    pub device: String,
    /// Seconds a loaded model may stay unused before it is unloaded
    pub model_idle_timeout: u64,
    /// Per-request budget; the pipeline is cancelled once it elapses
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    pub sqlite_path: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_path() -> &'static str {
        "config.toml"
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut models = BTreeMap::new();
        models.insert(
            ModelType::ImageClassification,
            ModelConfig {
                artifact_path: PathBuf::from("models/vehicle_classifier.onnx"),
                input_width: 224,
                input_height: 224,
                input_tensor_names: vec!["input_1".to_string()],
                output_tensor_names: vec!["dense_5".to_string()],
                output: OutputKind::Classification,
                normalization: Normalization::Unit,
                box_space: BoxSpace::Source,
                labels: Vec::new(),
            },
        );
        models.insert(
            ModelType::VehicleDetection,
            ModelConfig {
                artifact_path: PathBuf::from("models/vehicle_detection.onnx"),
                input_width: 640,
                input_height: 640,
                input_tensor_names: vec!["images".to_string()],
                output_tensor_names: vec![
                    "detection_boxes".to_string(),
                    "detection_classes".to_string(),
                    "detection_scores".to_string(),
                ],
                output: OutputKind::Detection,
                normalization: Normalization::Raw,
                box_space: BoxSpace::Source,
                labels: vec!["vehicle".to_string()],
            },
        );
        models.insert(
            ModelType::LicensePlateDetection,
            ModelConfig {
                artifact_path: PathBuf::from("models/license_plate_detection.onnx"),
                input_width: 320,
                input_height: 320,
                input_tensor_names: vec!["images".to_string()],
                output_tensor_names: vec![
                    "detection_boxes".to_string(),
                    "detection_classes".to_string(),
                    "detection_scores".to_string(),
                ],
                output: OutputKind::Detection,
                normalization: Normalization::Raw,
                box_space: BoxSpace::Source,
                labels: vec!["license_plate".to_string()],
            },
        );

        Self {
            server: ServerConfig { rest_port: 3000 },
            inference: InferenceConfig {
                device: "CPU".to_string(),
                model_idle_timeout: 300,
                request_timeout_ms: default_request_timeout_ms(),
            },
            models,
            storage: StorageConfig {
                storage_type: StorageType::Sqlite,
                sqlite_path: Some(PathBuf::from("data/results.db")),
            },
        }
    }
}
