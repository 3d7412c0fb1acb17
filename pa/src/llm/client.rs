//! LlmClient trait definition

use async_trait::async_trait;

use super::LlmError;

/// Stateless LLM client - each call is independent
///
/// The orchestrator treats the response as opaque text; it is the caller's job
/// to parse it.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a prompt and return the model's text response
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing::debug;

    /// Mock LLM client for unit tests
    ///
    /// Returns the scripted responses in order, then errors.
    pub struct MockLlmClient {
        responses: Vec<String>,
        delay: Option<Duration>,
        call_count: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<String>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self {
                responses,
                delay: None,
                call_count: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Always answer with the same text
        pub fn always(response: impl Into<String>, calls: usize) -> Self {
            Self::new(vec![response.into(); calls])
        }

        /// Sleep before answering
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            debug!("MockLlmClient::generate: called");
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.responses.get(idx).cloned().ok_or_else(|| {
                debug!("MockLlmClient::generate: no more mock responses");
                LlmError::InvalidResponse("No more mock responses".to_string())
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_responses() {
            let client = MockLlmClient::new(vec!["Response 1".to_string(), "Response 2".to_string()]);

            assert_eq!(client.generate("a").await.unwrap(), "Response 1");
            assert_eq!(client.generate("b").await.unwrap(), "Response 2");
            assert_eq!(client.call_count(), 2);
            assert_eq!(client.prompts(), vec!["a".to_string(), "b".to_string()]);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            assert!(client.generate("prompt").await.is_err());
        }
    }
}
