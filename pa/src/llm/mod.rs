//! LLM Client module for pipeagent
//!
//! The orchestrator only sees the `LlmClient` trait: prompt text in, response
//! text out.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod offline;
mod openai;

pub use client::LlmClient;
pub use error::LlmError;
pub use offline::OfflineClient;
pub use openai::OpenAIClient;

use crate::config::{ModelConfig, Provider};

/// Create an LLM client for the configured provider
pub fn create_client(config: &ModelConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.name, "create_client: called");
    match config.provider {
        Provider::Offline => {
            debug!("create_client: creating offline client");
            Ok(Arc::new(OfflineClient::new(&config.name)))
        }
        Provider::OpenAI => {
            debug!("create_client: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::from_config(config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_offline_client() {
        let client = create_client(&ModelConfig::named("m")).unwrap();
        assert_eq!(client.generate("hi").await.unwrap(), "Mock LLM Response");
    }
}
