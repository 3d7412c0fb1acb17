//! OpenAI-compatible API client
//!
//! Implements the LlmClient trait against a Chat Completions endpoint. Model
//! serving gateways that speak the same protocol work by pointing `base-url`
//! at them.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{LlmClient, LlmError};
use crate::config::ModelConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Longest server-requested wait honoured between attempts
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Delay before retry number `attempt` (starting at 1)
fn retry_delay(error: &LlmError, attempt: u32) -> Duration {
    match error.retry_after() {
        Some(wait) => wait.min(MAX_RETRY_AFTER),
        None => Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt.saturating_sub(1))),
    }
}

/// Map a non-success response to an error
fn status_error(status: u16, retry_after: Option<&str>, message: String) -> LlmError {
    if status == 429 {
        let retry_after = retry_after
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_millis(INITIAL_BACKOFF_MS));
        return LlmError::RateLimited { retry_after };
    }
    LlmError::ApiError { status, message }
}

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIClient {
    /// Create a new client from model configuration
    pub fn from_config(config: &ModelConfig) -> Result<Self, LlmError> {
        debug!(model = %config.name, base_url = %config.base_url, "OpenAIClient::from_config: called");
        let api_key = config.api_key().map_err(|e| LlmError::Config(e.to_string()))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.name.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        debug!(%self.model, %self.max_tokens, "build_request_body: called");
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }

    /// Extract the first choice's text
    fn parse_response(&self, api_response: OpenAIResponse) -> Result<String, LlmError> {
        debug!(choices = %api_response.choices.len(), "parse_response: called");
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response contained no message content".to_string()))
    }

    /// One request/response exchange
    async fn send_once(&self, url: &str, body: &serde_json::Value) -> Result<String, LlmError> {
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let text = response.text().await.unwrap_or_default();
            debug!(status = %status.as_u16(), "send_once: API error");
            return Err(status_error(status.as_u16(), retry_after.as_deref(), text));
        }

        let api_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        self.parse_response(api_response)
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(%self.model, prompt_len = %prompt.len(), "generate: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(prompt);

        let mut attempt = 0;
        loop {
            let error = match self.send_once(&url, &body).await {
                Ok(text) => {
                    debug!(attempt, "generate: success");
                    return Ok(text);
                }
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= MAX_RETRIES {
                debug!(attempt, error = %error, "generate: giving up");
                return Err(error);
            }

            attempt += 1;
            let delay = retry_delay(&error, attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "generate: retrying after transient error"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn client() -> OpenAIClient {
        OpenAIClient {
            model: "gpt-4o".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.openai.com".to_string(),
            http: Client::new(),
            temperature: 0.1,
            max_tokens: 4096,
        }
    }

    #[test]
    fn test_build_request_body() {
        let body = client().build_request_body("User Request: sales");

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 4096);
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "User Request: sales");
    }

    #[test]
    fn test_parse_response_first_choice() {
        let api_response: OpenAIResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "{\"a\": 1}"}}, {"message": {"content": "second"}}]}"#,
        )
        .unwrap();
        assert_eq!(client().parse_response(api_response).unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn test_parse_response_empty_choices() {
        let api_response: OpenAIResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            client().parse_response(api_response),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_status_error_reads_retry_after() {
        let err = status_error(429, Some(" 5 "), String::new());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));

        let err = status_error(429, None, String::new());
        assert_eq!(err.retry_after(), Some(Duration::from_millis(INITIAL_BACKOFF_MS)));

        let err = status_error(408, None, "slow".to_string());
        assert!(matches!(err, LlmError::ApiError { status: 408, .. }));
        assert!(err.is_retryable());
        assert!(!status_error(400, None, String::new()).is_retryable());
    }

    #[test]
    fn test_retry_delay() {
        let huge = LlmError::RateLimited {
            retry_after: Duration::from_secs(3600),
        };
        assert_eq!(retry_delay(&huge, 1), MAX_RETRY_AFTER);

        let immediate = LlmError::RateLimited {
            retry_after: Duration::ZERO,
        };
        assert_eq!(retry_delay(&immediate, 2), Duration::ZERO);

        let unavailable = status_error(503, None, String::new());
        assert_eq!(retry_delay(&unavailable, 1), Duration::from_millis(1000));
        assert_eq!(retry_delay(&unavailable, 2), Duration::from_millis(2000));
        assert_eq!(retry_delay(&unavailable, 3), Duration::from_millis(4000));
    }

    fn reply(status: &str, headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n{headers}\r\n{body}",
            body.len()
        )
    }

    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Answers successive connections with the given raw responses
    async fn serve(replies: Vec<String>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let served = Arc::new(AtomicUsize::new(0));
        let counter = served.clone();

        tokio::spawn(async move {
            for reply in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                read_request(&mut stream).await;
                counter.fetch_add(1, Ordering::SeqCst);
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });

        (base_url, served)
    }

    fn client_at(base_url: String) -> OpenAIClient {
        OpenAIClient { base_url, ..client() }
    }

    const OK_BODY: &str = r#"{"choices": [{"message": {"content": "hello"}}]}"#;

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let (base_url, served) = serve(vec![
            reply("429 Too Many Requests", "retry-after: 0\r\n", "{}"),
            reply("200 OK", "", OK_BODY),
        ])
        .await;

        let text = client_at(base_url).generate("prompt").await.unwrap();
        assert_eq!(text, "hello");
        assert_eq!(served.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_max_retries() {
        let replies = (0..=MAX_RETRIES)
            .map(|_| reply("429 Too Many Requests", "retry-after: 0\r\n", "{}"))
            .collect();
        let (base_url, served) = serve(replies).await;

        let err = client_at(base_url).generate("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { .. }));
        assert_eq!(served.load(Ordering::SeqCst), MAX_RETRIES as usize + 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (base_url, served) = serve(vec![
            reply("400 Bad Request", "", r#"{"error": "bad"}"#),
            reply("200 OK", "", OK_BODY),
        ])
        .await;

        let err = client_at(base_url).generate("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::ApiError { status: 400, .. }));
        assert_eq!(served.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let mut config = ModelConfig::named("gpt-4o");
        config.api_key_env = "PIPEAGENT_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert!(matches!(OpenAIClient::from_config(&config), Err(LlmError::Config(_))));
    }
}
