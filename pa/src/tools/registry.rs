//! ToolRegistry - configured tools and their handlers

use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::debug;

use super::builtin::{PythonExecTool, SqlExecTool};
use super::{Tool, ToolKind, ToolResult};
use crate::config::ToolDescriptor;
use crate::validation::CodeSafetyAnalyzer;

/// Configured tools, keyed by kind
pub struct ToolRegistry {
    tools: BTreeMap<ToolKind, (Box<dyn Tool>, ToolDescriptor)>,
}

impl ToolRegistry {
    /// Build the registry from config descriptors
    ///
    /// Later descriptors for the same kind replace earlier ones.
    pub fn from_descriptors(descriptors: &[ToolDescriptor], analyzer: &CodeSafetyAnalyzer) -> Self {
        debug!(count = %descriptors.len(), "ToolRegistry::from_descriptors: called");
        let mut tools = BTreeMap::new();
        for descriptor in descriptors {
            tools.insert(descriptor.name, (handler(descriptor.name, analyzer), descriptor.clone()));
        }
        Self { tools }
    }

    /// Create an empty registry (for testing)
    pub fn empty() -> Self {
        debug!("ToolRegistry::empty: called");
        Self { tools: BTreeMap::new() }
    }

    pub fn get(&self, kind: ToolKind) -> Option<&dyn Tool> {
        self.tools.get(&kind).map(|(tool, _)| tool.as_ref())
    }

    /// Names of configured tools, in a stable order
    pub fn list(&self) -> Vec<&'static str> {
        self.tools.keys().map(|k| k.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool descriptions for the generation prompt
    pub fn definitions(&self) -> Vec<Value> {
        debug!("ToolRegistry::definitions: called");
        self.tools
            .iter()
            .map(|(kind, (tool, descriptor))| {
                json!({
                    "name": kind.name(),
                    "description": tool.description(),
                    "input_schema": tool.input_schema(),
                    "settings": descriptor.settings,
                })
            })
            .collect()
    }

    /// Execute a configured tool
    pub async fn execute(&self, kind: ToolKind, input: Value) -> ToolResult {
        debug!(%kind, "ToolRegistry::execute: called");
        match self.get(kind) {
            Some(tool) => tool.execute(input).await,
            None => {
                debug!(%kind, "ToolRegistry::execute: tool not configured");
                ToolResult::error(format!("Tool not configured: {}", kind))
            }
        }
    }
}

/// Exhaustive kind-to-handler dispatch
fn handler(kind: ToolKind, analyzer: &CodeSafetyAnalyzer) -> Box<dyn Tool> {
    match kind {
        ToolKind::PythonExec => Box::new(PythonExecTool::new(analyzer.clone())),
        ToolKind::SqlExec => Box::new(SqlExecTool),
    }
}
