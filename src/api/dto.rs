//! Data Transfer Objects for API

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::decoder::{DetectionResult, InferenceResult};
use crate::error::Result;
use crate::service::{CascadeOutcome, InferenceRequest};

/// Message returned when stage 1 finds no vehicle
pub const NO_VEHICLE_MESSAGE: &str = "No Vehicle Present";

/// Body of every inference endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequestDto {
    /// Base64-encoded image
    #[serde(alias = "imageBase64String")]
    pub image_data: Option<String>,
    pub model_type: Option<String>,
}

impl InferenceRequestDto {
    pub fn into_request(self) -> Result<InferenceRequest> {
        InferenceRequest::from_parts(self.image_data, self.model_type.as_deref())
    }
}

/// Classification response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    pub record_id: String,
    pub predicted_class: String,
    pub probability_scores: Vec<f32>,
    pub inference_time_ms: u64,
}

/// Single-stage prediction response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub model_type: String,
    pub result: InferenceResult,
    pub inference_time_ms: u64,
}

/// Cascade response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub message: String,
    pub vehicle_detection: Option<DetectionResult>,
    pub license_plate_detection: Option<DetectionResult>,
    pub record_ids: Vec<String>,
    pub inference_time_ms: u64,
}

impl DetectResponse {
    pub fn from_outcome(outcome: CascadeOutcome, inference_time_ms: u64) -> Self {
        match outcome {
            CascadeOutcome::NoVehiclePresent => Self {
                message: NO_VEHICLE_MESSAGE.to_string(),
                vehicle_detection: None,
                license_plate_detection: None,
                record_ids: Vec::new(),
                inference_time_ms,
            },
            CascadeOutcome::Detected(result) => {
                let message = if result.license_plate_detection.is_some() {
                    "Vehicle and license plate detected"
                } else {
                    "Vehicle detected, no license plate found"
                };
                let record_ids = std::iter::once(result.vehicle_record_id)
                    .chain(result.license_plate_record_id)
                    .collect();

                Self {
                    message: message.to_string(),
                    vehicle_detection: Some(result.vehicle_detection),
                    license_plate_detection: result.license_plate_detection,
                    record_ids,
                    inference_time_ms,
                }
            }
        }
    }
}

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub models_loaded: HashMap<String, bool>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}
