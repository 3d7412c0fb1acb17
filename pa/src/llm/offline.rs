//! Offline LLM client
//!
//! Deterministic stand-in for a serving endpoint. Pipeline-generation prompts
//! (those carrying a `User Request:` line) get a fixed two-table definition;
//! anything else gets a plain text answer.

use async_trait::async_trait;
use tracing::debug;

use super::{LlmClient, LlmError};

/// Marker the generation prompt template always contains
const GENERATION_MARKER: &str = "User Request:";

const PIPELINE_RESPONSE: &str = r#"
{
    "pipeline_name": "mock_pipeline",
    "target_schema": "mock_schema",
    "tables": [
        {
            "name": "bronze_table",
            "description": "Raw data ingestion",
            "query": "SELECT * FROM cloud_files(...)"
        },
        {
            "name": "silver_table",
            "description": "Cleaned data",
            "query": "SELECT * FROM LIVE.bronze_table WHERE id IS NOT NULL"
        }
    ]
}
"#;

const PLAIN_RESPONSE: &str = "Mock LLM Response";

/// Canned-response client, used when `model.provider` is `offline`
#[derive(Debug, Clone)]
pub struct OfflineClient {
    model: String,
}

impl OfflineClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }
}

#[async_trait]
impl LlmClient for OfflineClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(model = %self.model, prompt_len = %prompt.len(), "OfflineClient::generate: called");
        if prompt.contains(GENERATION_MARKER) {
            debug!("OfflineClient::generate: pipeline generation prompt");
            Ok(PIPELINE_RESPONSE.to_string())
        } else {
            debug!("OfflineClient::generate: plain prompt");
            Ok(PLAIN_RESPONSE.to_string())
        }
    }
}
