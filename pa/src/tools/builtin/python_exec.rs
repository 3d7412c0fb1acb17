//! Python exec tool - dry-run gate for workspace python execution

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::tools::{Tool, ToolKind, ToolResult};
use crate::validation::CodeSafetyAnalyzer;

/// Screens python source with the safety analyzer; nothing is executed locally
pub struct PythonExecTool {
    analyzer: CodeSafetyAnalyzer,
}

impl PythonExecTool {
    pub fn new(analyzer: CodeSafetyAnalyzer) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl Tool for PythonExecTool {
    fn kind(&self) -> ToolKind {
        ToolKind::PythonExec
    }

    fn description(&self) -> &'static str {
        "Run python code in the workspace. Code is screened for forbidden calls before it is accepted."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python source to run"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, input: Value) -> ToolResult {
        debug!(?input, "PythonExecTool::execute: called");
        let code = match input.get("code").and_then(|v| v.as_str()) {
            Some(code) => code,
            None => {
                debug!("PythonExecTool::execute: missing code parameter");
                return ToolResult::error("Missing required parameter: code");
            }
        };

        let report = self.analyzer.analyze(code);
        if !report.is_empty() {
            debug!(violations = %report.len(), "PythonExecTool::execute: rejected");
            return ToolResult::error(format!("Python rejected: {}", report));
        }

        ToolResult::success(format!(
            "Python accepted for execution (dry run, {} lines)",
            code.lines().count()
        ))
    }
}
