//! Output decoding
//!
//! Turns raw named output tensors into typed results. The decode path is
//! chosen from the model's declared output kind, never from the tensors.

use serde::{Deserialize, Serialize};

use super::registry::{BoxSpace, ModelConfig, OutputKind};
use super::runtime::{NamedTensors, Tensor};
use crate::error::{PipelineError, Result};
use crate::utils::math::argmax;

/// Label for a positive classification
pub const VEHICLE_LABEL: &str = "Vehicle";
/// Label for a negative classification
pub const NON_VEHICLE_LABEL: &str = "Non-Vehicle";
/// Score index holding the vehicle probability
pub const VEHICLE_SCORE_INDEX: usize = 1;
/// Vehicle probability above which the image is labelled a vehicle
pub const VEHICLE_THRESHOLD: f32 = 0.5;

/// Axis-aligned box `[x_min, y_min, x_max, y_max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }

    /// Order the corners and clamp them to `[0, width] x [0, height]`
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let clamp = |v: f32, limit: f32| v.max(0.0).min(limit);
        let (x0, x1) = (clamp(self.x_min, w), clamp(self.x_max, w));
        let (y0, y1) = (clamp(self.y_min, h), clamp(self.y_max, h));
        Self::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Zero for inverted, collapsed or NaN boxes
    pub fn area(&self) -> f32 {
        let w = self.x_max - self.x_min;
        let h = self.y_max - self.y_min;
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x_min + dx, self.y_min + dy, self.x_max + dx, self.y_max + dy)
    }

    fn scale(&self, sx: f32, sy: f32) -> Self {
        Self::new(self.x_min * sx, self.y_min * sy, self.x_max * sx, self.y_max * sy)
    }

    /// Map a box from the model's coordinate space to source-image pixels
    pub fn to_source_space(&self, config: &ModelConfig, source: (u32, u32)) -> Self {
        let (src_w, src_h) = (source.0 as f32, source.1 as f32);
        match config.box_space {
            BoxSpace::Source => *self,
            BoxSpace::Input => self.scale(
                src_w / config.input_width as f32,
                src_h / config.input_height as f32,
            ),
            BoxSpace::Normalized => self.scale(src_w, src_h),
        }
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub probability_scores: Vec<f32>,
}

impl ClassificationResult {
    /// Fixed binary decision: the score at index 1 above 0.5 means a vehicle
    pub fn predicted_class(&self) -> &'static str {
        match self.probability_scores.get(VEHICLE_SCORE_INDEX) {
            Some(score) if *score > VEHICLE_THRESHOLD => VEHICLE_LABEL,
            _ => NON_VEHICLE_LABEL,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    #[serde(rename = "box")]
    pub bbox: Option<BoundingBox>,
    pub class_name: Option<String>,
    pub score: Option<f32>,
}

impl DetectionResult {
    /// Nothing was detected
    pub fn is_empty(&self) -> bool {
        self.bbox.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InferenceResult {
    Classification(ClassificationResult),
    Detection(DetectionResult),
}

/// Decode raw outputs according to the model's declared output kind
pub fn decode(outputs: &NamedTensors, config: &ModelConfig) -> Result<InferenceResult> {
    match config.output {
        OutputKind::Classification => decode_classification(outputs, config).map(InferenceResult::Classification),
        OutputKind::Detection => decode_detection(outputs, config).map(InferenceResult::Detection),
    }
}

fn output_name(config: &ModelConfig, index: usize) -> Result<&str> {
    config
        .output_tensor_names
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| PipelineError::Configuration(format!("No output tensor name at position {}", index)))
}

fn output<'a>(outputs: &'a NamedTensors, name: &str) -> Result<&'a Tensor> {
    outputs.get(name).ok_or_else(|| PipelineError::UnsupportedOutput {
        name: name.to_string(),
    })
}

pub fn decode_classification(outputs: &NamedTensors, config: &ModelConfig) -> Result<ClassificationResult> {
    let name = output_name(config, 0)?;
    let probability_scores: Vec<f32> = output(outputs, name)?.iter().copied().collect();

    if probability_scores.len() <= VEHICLE_SCORE_INDEX {
        return Err(PipelineError::Decode(format!(
            "Output '{}' holds {} scores, expected at least {}",
            name,
            probability_scores.len(),
            VEHICLE_SCORE_INDEX + 1
        )));
    }

    Ok(ClassificationResult { probability_scores })
}

/// Decode a single detection.
///
/// Output order: box first, then class (only when three outputs are
/// configured), score last. Only the first box of a multi-box output is
/// used.
pub fn decode_detection(outputs: &NamedTensors, config: &ModelConfig) -> Result<DetectionResult> {
    let box_name = output_name(config, 0)?;
    let box_values: Vec<f32> = output(outputs, box_name)?.iter().take(4).copied().collect();

    if box_values.is_empty() {
        return Ok(DetectionResult::default());
    }
    if box_values.len() < 4 {
        return Err(PipelineError::Decode(format!(
            "Output '{}' holds {} box coordinates, expected 4",
            box_name,
            box_values.len()
        )));
    }
    let bbox = BoundingBox::new(box_values[0], box_values[1], box_values[2], box_values[3]);

    let names = &config.output_tensor_names;
    let (class_index, score_index) = match names.len() {
        0 | 1 => (None, None),
        2 => (None, Some(1)),
        _ => (Some(1), Some(2)),
    };

    let score = match score_index {
        Some(index) => output(outputs, &names[index])?.iter().next().copied(),
        None => None,
    };

    let class_name = match class_index {
        Some(index) if !config.labels.is_empty() => {
            let classes = output(outputs, &names[index])?;
            class_label(classes, &config.labels)
        }
        _ if config.labels.len() == 1 => Some(config.labels[0].clone()),
        _ => None,
    };

    Ok(DetectionResult {
        bbox: Some(bbox),
        class_name,
        score,
    })
}

/// A single value is a class id; a longer vector holds per-class scores
fn class_label(classes: &Tensor, labels: &[String]) -> Option<String> {
    let values: Vec<f32> = classes.iter().copied().collect();
    let index = match values.len() {
        0 => return None,
        1 if values[0] >= 0.0 => values[0].round() as usize,
        1 => return None,
        _ => argmax(&values),
    };
    labels.get(index).cloned()
}
