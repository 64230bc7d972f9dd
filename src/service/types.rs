//! Service layer types

use serde::{Deserialize, Serialize};

use crate::engine::decoder::DetectionResult;
use crate::engine::registry::ModelType;
use crate::error::{PipelineError, Result};

/// A request that passed the entry gate
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    /// Base64-encoded image
    pub image_data: String,
    pub model_type: ModelType,
}

impl InferenceRequest {
    /// Structural validation of raw request fields.
    ///
    /// Only presence and the model type spelling are checked here; image
    /// contents are validated by the preprocessor before any inference.
    pub fn from_parts(image_data: Option<String>, model_type: Option<&str>) -> Result<Self> {
        let image_data = image_data
            .filter(|data| !data.trim().is_empty())
            .ok_or_else(|| PipelineError::InputValidation("Missing imageData".to_string()))?;
        let model_type = model_type
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PipelineError::InputValidation("Missing modelType".to_string()))?
            .trim()
            .parse::<ModelType>()?;

        Ok(Self { image_data, model_type })
    }
}

/// Classification outcome after persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResult {
    pub record_id: String,
    pub predicted_class: String,
    pub probability_scores: Vec<f32>,
    pub inference_time_ms: u64,
}

/// Both stages of a cascade that found a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeResult {
    pub vehicle_detection: DetectionResult,
    pub vehicle_record_id: String,
    pub license_plate_detection: Option<DetectionResult>,
    pub license_plate_record_id: Option<String>,
}

/// Terminal state of the detection cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CascadeOutcome {
    /// Stage 1 found nothing; nothing was persisted
    NoVehiclePresent,
    Detected(CascadeResult),
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResult {
    pub healthy: bool,
    pub version: String,
    pub models_loaded: std::collections::HashMap<String, bool>,
}
