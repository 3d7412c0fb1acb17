//! Request outcome and batch record types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Result of handling one request
///
/// Serializes untagged so callers see either `{"code": ..., "pipeline_config": ...}`
/// or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestOutcome {
    Generated {
        #[serde(rename = "code")]
        generated_code: String,
        pipeline_config: Value,
    },
    Failed {
        error: String,
    },
}

impl RequestOutcome {
    pub fn generated(generated_code: impl Into<String>, pipeline_config: Value) -> Self {
        Self::Generated {
            generated_code: generated_code.into(),
            pipeline_config,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed { error: error.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// The error message, if this outcome is a failure
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Generated { .. } => None,
        }
    }

    /// Encode as a single-line JSON record
    pub fn to_json(&self) -> String {
        debug!(is_error = %self.is_error(), "RequestOutcome::to_json: called");
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, "RequestOutcome::to_json: encoding failed");
                serde_json::json!({ "error": format!("Failed to encode outcome: {}", e) }).to_string()
            }
        }
    }
}

/// One input record of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    #[serde(default)]
    pub request: Option<String>,
}

impl BatchRecord {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: Some(request.into()),
        }
    }

    /// The request text, or None when absent or blank
    pub fn request_text(&self) -> Option<&str> {
        self.request.as_deref().filter(|r| !r.trim().is_empty())
    }
}
