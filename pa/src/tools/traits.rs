//! Tool trait definition

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::ToolKind;

/// A tool handler the model can be told about
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which kind this handler implements
    fn kind(&self) -> ToolKind;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Execute the tool
    async fn execute(&self, input: Value) -> ToolResult;
}

/// Result of a tool execution
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(content: impl Into<String>) -> Self {
        debug!("ToolResult::success: called");
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(content: impl Into<String>) -> Self {
        debug!("ToolResult::error: called");
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("SQL accepted");
        assert!(!result.is_error);
        assert_eq!(result.content, "SQL accepted");
    }

    #[test]
    fn test_tool_result_error() {
        let result = ToolResult::error("Missing required parameter: query");
        assert!(result.is_error);
        assert_eq!(result.content, "Missing required parameter: query");
    }
}
