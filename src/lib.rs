//! Vehicle Inspection Service Library

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{PipelineError, Result};
