//! Pipeline error taxonomy

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the inference pipeline.
///
/// "Nothing detected" is not represented here: an empty detection is a
/// normal decoded outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Model type unresolved or its registry entry is incomplete
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed request or encoded image; surfaced to the client
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// Non-positive target width or height
    #[error("Invalid model input dimensions: {width}x{height}")]
    Dimension { width: u32, height: u32 },

    /// A present output tensor has an unusable shape
    #[error("Failed to decode model output: {0}")]
    Decode(String),

    /// A configured output tensor name is missing from the model outputs
    #[error("Model output '{name}' not found")]
    UnsupportedOutput { name: String },

    /// Runtime failure while loading or running a model
    #[error("{context}: {source}")]
    InferenceEngine {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The request was cancelled before the stage completed
    #[error("Inference cancelled")]
    Cancelled,

    /// The record store rejected a write or read
    #[error("Storage error: {0}")]
    Storage(#[source] BoxError),
}

impl PipelineError {
    pub fn engine(context: impl Into<String>, source: anyhow::Error) -> Self {
        PipelineError::InferenceEngine {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn storage(source: anyhow::Error) -> Self {
        PipelineError::Storage(source.into())
    }

    /// Whether the error should be reported as a client mistake
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InputValidation(_))
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "CONFIGURATION_ERROR",
            PipelineError::InputValidation(_) => "INVALID_INPUT",
            PipelineError::Dimension { .. } => "DIMENSION_ERROR",
            PipelineError::Decode(_) => "DECODE_ERROR",
            PipelineError::UnsupportedOutput { .. } => "UNSUPPORTED_OUTPUT",
            PipelineError::InferenceEngine { .. } => "INFERENCE_FAILED",
            PipelineError::Cancelled => "CANCELLED",
            PipelineError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
