//! Per-request error types

use thiserror::Error;

use crate::llm::LlmError;
use crate::validation::{SafetyReport, ValidationReport};

/// Anything that can fail a single request
///
/// Every variant is caught at the request boundary and turned into an
/// `{"error": ...}` outcome; messages keep the full diagnostic detail.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("No request provided.")]
    MissingInput,

    #[error("LLM did not return valid JSON. Response: {raw}")]
    ResponseFormat { raw: String },

    #[error("Validation Error: Invalid pipeline request: {0}")]
    RequestValidation(ValidationReport),

    #[error("Generated code failed validation: {0}")]
    CodeIntegrity(SafetyReport),

    #[error("Template error: {0}")]
    Template(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Generated pipeline config is not valid JSON: {source}. Rendered: {rendered}")]
    ConfigRender {
        rendered: String,
        source: serde_json::Error,
    },
}
