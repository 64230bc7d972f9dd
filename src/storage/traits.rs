//! Storage abstraction traits
//!
//! Defines the interface for inference result persistence.
//! Implementations can be swapped between SQLite and in-memory storage.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::decoder::{BoundingBox, ClassificationResult, DetectionResult};
use crate::engine::registry::{ModelType, OutputKind};

/// A stored inference result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRecord {
    /// Unique record ID (UUID)
    pub id: String,
    pub model_type: ModelType,
    pub kind: OutputKind,
    /// Base64 image the stage ran on
    pub image_data: Option<String>,
    pub predicted_class: Option<String>,
    pub probability_scores: Option<Vec<f32>>,
    #[serde(rename = "box")]
    pub bbox: Option<BoundingBox>,
    pub class_name: Option<String>,
    pub score: Option<f32>,
    /// Creation timestamp (unix seconds)
    pub created_at: i64,
}

impl InferenceRecord {
    fn empty(model_type: ModelType, kind: OutputKind, image_data: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            model_type,
            kind,
            image_data,
            predicted_class: None,
            probability_scores: None,
            bbox: None,
            class_name: None,
            score: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn classification(model_type: ModelType, image_data: Option<String>, result: &ClassificationResult) -> Self {
        Self {
            predicted_class: Some(result.predicted_class().to_string()),
            probability_scores: Some(result.probability_scores.clone()),
            ..Self::empty(model_type, OutputKind::Classification, image_data)
        }
    }

    pub fn detection(model_type: ModelType, image_data: Option<String>, result: &DetectionResult) -> Self {
        Self {
            bbox: result.bbox,
            class_name: result.class_name.clone(),
            score: result.score,
            ..Self::empty(model_type, OutputKind::Detection, image_data)
        }
    }
}

/// Result storage trait
/// Implementations must be thread-safe and async-compatible
#[async_trait]
pub trait ResultStorage: Send + Sync + 'static {
    /// Save a new record, returning the stored record
    async fn add(&self, record: InferenceRecord) -> Result<InferenceRecord>;

    /// Get a record by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<InferenceRecord>>;

    /// Get all records, oldest first
    async fn get_all(&self) -> Result<Vec<InferenceRecord>>;

    /// Replace an existing record; false when the ID is unknown
    async fn update(&self, record: &InferenceRecord) -> Result<bool>;

    /// Delete a record; false when the ID is unknown
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Get total record count
    async fn count(&self) -> Result<i64>;
}
