//! Model configuration registry
//!
//! Maps a model type to the artifact and tensor layout that serve it. Built
//! once from configuration and read-only afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Selector for the configuration and decoding path of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Undefined,
    ImageClassification,
    VehicleDetection,
    LicensePlateDetection,
    DamageDetection,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Undefined => "undefined",
            ModelType::ImageClassification => "image_classification",
            ModelType::VehicleDetection => "vehicle_detection",
            ModelType::LicensePlateDetection => "license_plate_detection",
            ModelType::DamageDetection => "damage_detection",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = PipelineError;

    /// Accepts both `VehicleDetection` and `vehicle_detection` spellings.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "undefined" => Ok(ModelType::Undefined),
            "imageclassification" => Ok(ModelType::ImageClassification),
            "vehicledetection" => Ok(ModelType::VehicleDetection),
            "licenseplatedetection" => Ok(ModelType::LicensePlateDetection),
            "damagedetection" => Ok(ModelType::DamageDetection),
            _ => Err(PipelineError::InputValidation(format!("Unknown model type: {}", s))),
        }
    }
}

/// Declared shape of a model's outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Classification,
    Detection,
}

/// Pixel scaling applied while building the input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Channel values kept in [0, 255]
    Raw,
    /// Channel values scaled to [0, 1]
    Unit,
}

/// Coordinate space of the boxes a detection model emits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxSpace {
    /// Pixels of the submitted image
    #[default]
    Source,
    /// Pixels of the resized model input
    Input,
    /// Fractions of the image size in [0, 1]
    Normalized,
}

/// Settings for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub artifact_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub input_tensor_names: Vec<String>,
    pub output_tensor_names: Vec<String>,
    pub output: OutputKind,
    pub normalization: Normalization,
    #[serde(default)]
    pub box_space: BoxSpace,
    /// Class names indexed by the class output of a detection model
    #[serde(default)]
    pub labels: Vec<String>,
}

impl ModelConfig {
    /// Name the preprocessed image tensor is fed under
    pub fn primary_input(&self) -> Result<&str> {
        self.input_tensor_names
            .first()
            .map(String::as_str)
            .ok_or_else(|| PipelineError::Configuration("No input tensor name configured".to_string()))
    }

    fn check(&self, model_type: ModelType) -> Result<()> {
        if self.artifact_path.as_os_str().is_empty() {
            return Err(PipelineError::Configuration(format!(
                "Model {} has no artifact path",
                model_type
            )));
        }
        if self.input_width == 0 || self.input_height == 0 {
            return Err(PipelineError::Dimension {
                width: self.input_width,
                height: self.input_height,
            });
        }
        if self.input_tensor_names.is_empty() || self.output_tensor_names.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "Model {} must name at least one input and one output tensor",
                model_type
            )));
        }
        Ok(())
    }
}

/// Immutable model type to configuration mapping
#[derive(Debug, Clone, Default)]
pub struct ModelConfigRegistry {
    models: BTreeMap<ModelType, ModelConfig>,
}

impl ModelConfigRegistry {
    /// Build the registry, rejecting incomplete entries
    pub fn from_settings(models: BTreeMap<ModelType, ModelConfig>) -> Result<Self> {
        if models.contains_key(&ModelType::Undefined) {
            return Err(PipelineError::Configuration(
                "'undefined' cannot be configured as a model".to_string(),
            ));
        }
        for (model_type, config) in &models {
            config.check(*model_type)?;
        }
        Ok(Self { models })
    }

    /// Look up the configuration for a model type
    pub fn resolve(&self, model_type: ModelType) -> Result<&ModelConfig> {
        if model_type == ModelType::Undefined {
            return Err(PipelineError::Configuration(format!(
                "Unsupported model type: {}",
                model_type
            )));
        }
        self.models.get(&model_type).ok_or_else(|| {
            PipelineError::Configuration(format!("No configuration for model type: {}", model_type))
        })
    }

    pub fn model_types(&self) -> impl Iterator<Item = ModelType> + '_ {
        self.models.keys().copied()
    }
}

#[cfg(test)]
pub(crate) fn test_config(output: OutputKind, outputs: &[&str]) -> ModelConfig {
    ModelConfig {
        artifact_path: PathBuf::from("models/test.onnx"),
        input_width: 8,
        input_height: 6,
        input_tensor_names: vec!["input".to_string()],
        output_tensor_names: outputs.iter().map(|s| s.to_string()).collect(),
        output,
        normalization: Normalization::Unit,
        box_space: BoxSpace::Source,
        labels: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModelConfigRegistry {
        let mut models = BTreeMap::new();
        models.insert(
            ModelType::ImageClassification,
            test_config(OutputKind::Classification, &["dense_5"]),
        );
        ModelConfigRegistry::from_settings(models).unwrap()
    }

    #[test]
    fn test_resolve_configured_type() {
        let registry = registry();
        let config = registry.resolve(ModelType::ImageClassification).unwrap();
        assert_eq!(config.output_tensor_names, vec!["dense_5".to_string()]);
        assert_eq!(config.primary_input().unwrap(), "input");
    }

    #[test]
    fn test_resolve_undefined_fails() {
        let err = registry().resolve(ModelType::Undefined).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_resolve_missing_type_fails() {
        let err = registry().resolve(ModelType::VehicleDetection).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut config = test_config(OutputKind::Detection, &["boxes"]);
        config.input_width = 0;
        let mut models = BTreeMap::new();
        models.insert(ModelType::VehicleDetection, config);
        let err = ModelConfigRegistry::from_settings(models).unwrap_err();
        assert!(matches!(err, PipelineError::Dimension { width: 0, .. }));
    }

    #[test]
    fn test_incomplete_entry_rejected() {
        let mut config = test_config(OutputKind::Detection, &[]);
        config.output_tensor_names.clear();
        let mut models = BTreeMap::new();
        models.insert(ModelType::VehicleDetection, config);
        assert!(matches!(
            ModelConfigRegistry::from_settings(models),
            Err(PipelineError::Configuration(_))
        ));

        let mut models = BTreeMap::new();
        models.insert(ModelType::Undefined, test_config(OutputKind::Detection, &["boxes"]));
        assert!(matches!(
            ModelConfigRegistry::from_settings(models),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_model_type_parsing() {
        assert_eq!("VehicleDetection".parse::<ModelType>().unwrap(), ModelType::VehicleDetection);
        assert_eq!(
            "license_plate_detection".parse::<ModelType>().unwrap(),
            ModelType::LicensePlateDetection
        );
        assert!("Truck".parse::<ModelType>().is_err());
        assert_eq!(ModelType::ImageClassification.to_string(), "image_classification");
    }
}
