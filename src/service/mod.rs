//! Service layer module

pub mod cancel;
pub mod inference_service;
pub mod types;

pub use cancel::{CancelSignal, CancelTimer};
pub use inference_service::InferenceService;
pub use types::*;
