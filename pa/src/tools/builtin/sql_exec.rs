//! SQL exec tool - dry-run gate for workspace SQL execution

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::tools::{Tool, ToolKind, ToolResult};

/// Accepts a single SQL statement; nothing is executed locally
pub struct SqlExecTool;

#[async_trait]
impl Tool for SqlExecTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SqlExec
    }

    fn description(&self) -> &'static str {
        "Run a single SQL statement against the workspace warehouse."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "One SQL statement"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value) -> ToolResult {
        debug!(?input, "SqlExecTool::execute: called");
        let query = match input.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q,
            _ => {
                debug!("SqlExecTool::execute: missing query parameter");
                return ToolResult::error("Missing required parameter: query");
            }
        };

        let statements = count_statements(query);
        if statements != 1 {
            debug!(%statements, "SqlExecTool::execute: rejected");
            return ToolResult::error(format!("Expected exactly one SQL statement, found {}", statements));
        }

        ToolResult::success("SQL accepted for execution (dry run)")
    }
}

/// Count `;`-separated statements, ignoring separators inside quoted literals
fn count_statements(sql: &str) -> usize {
    let mut count = 0;
    let mut current_has_text = false;
    let mut quote: Option<char> = None;

    for c in sql.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => {
                quote = Some(c);
                current_has_text = true;
            }
            (None, ';') => {
                if current_has_text {
                    count += 1;
                }
                current_has_text = false;
            }
            (None, c) if !c.is_whitespace() => current_has_text = true,
            (None, _) => {}
        }
    }

    if current_has_text {
        count += 1;
    }
    count
}
