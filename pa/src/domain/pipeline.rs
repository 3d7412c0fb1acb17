//! Pipeline definition types
//!
//! Immutable once built. Fields are private and only the schema validator
//! (`crate::validation::schema`) can construct values, so a `PipelineDefinition`
//! in hand is always well-formed.

use serde::Serialize;
use tracing::debug;

/// A validated pipeline: name, target schema and an ordered, non-empty table list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineDefinition {
    pipeline_name: String,
    target_schema: String,
    tables: Vec<TableDefinition>,
}

impl PipelineDefinition {
    pub(crate) fn new(pipeline_name: String, target_schema: String, tables: Vec<TableDefinition>) -> Self {
        debug!(%pipeline_name, %target_schema, table_count = %tables.len(), "PipelineDefinition::new: called");
        Self {
            pipeline_name,
            target_schema,
            tables,
        }
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    pub fn target_schema(&self) -> &str {
        &self.target_schema
    }

    /// Tables in declaration order (later tables may read earlier ones)
    pub fn tables(&self) -> &[TableDefinition] {
        &self.tables
    }
}

/// One named transformation step of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    query: String,
}

impl TableDefinition {
    pub(crate) fn new(name: String, description: Option<String>, query: String) -> Self {
        Self {
            name,
            description,
            query,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}
