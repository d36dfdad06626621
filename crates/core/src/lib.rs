//! Shared building blocks for the Leadgen segmentation tooling: application
//! configuration and the application-wide error type.

pub mod config;
pub mod error;

pub use crate::config::{AppConfig, SegmentationConfig, DEFAULT_MAX_DEPTH};
pub use crate::error::{LeadgenError, LeadgenResult};
