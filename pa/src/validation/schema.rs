//! Structural validation of model output into a `PipelineDefinition`
//!
//! Validation is exhaustive: every violated constraint across the top-level
//! fields and every table entry is collected before the report is returned.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{Span, debug, info_span};

use crate::domain::{PipelineDefinition, TableDefinition};

/// A single field-level problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field path, e.g. `tables[1].query`
    pub path: String,
    pub problem: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.problem)
    }
}

/// Ordered list of field errors; empty means valid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, path: impl Into<String>, problem: impl Into<String>) {
        let error = FieldError {
            path: path.into(),
            problem: problem.into(),
        };
        debug!(%error, "ValidationReport::add_error: called");
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True if any error is reported against exactly this path
    pub fn has_error_for(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s): ", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

/// Validates loosely-typed JSON into a `PipelineDefinition`
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    span: Span,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new(info_span!("schema_validator"))
    }
}

impl SchemaValidator {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Validate `raw`, returning the definition or the full list of problems
    pub fn validate(&self, raw: &Value) -> Result<PipelineDefinition, ValidationReport> {
        let _guard = self.span.enter();
        debug!("SchemaValidator::validate: called");
        let mut report = ValidationReport::new();

        let Some(obj) = raw.as_object() else {
            debug!("SchemaValidator::validate: root is not an object");
            report.add_error("(root)", format!("expected an object, got {}", type_name(raw)));
            return Err(report);
        };

        let pipeline_name = required_string(obj, &["pipeline_name", "pipelineName"], "pipeline_name", &mut report);
        let target_schema = required_string(obj, &["target_schema", "targetSchema"], "target_schema", &mut report);
        let tables = validate_tables(obj, &mut report);

        if !report.is_empty() {
            debug!(error_count = %report.len(), "SchemaValidator::validate: invalid");
            return Err(report);
        }

        match (pipeline_name, target_schema, tables) {
            (Some(pipeline_name), Some(target_schema), Some(tables)) => {
                debug!(%pipeline_name, "SchemaValidator::validate: valid");
                Ok(PipelineDefinition::new(pipeline_name, target_schema, tables))
            }
            _ => {
                // every None above records an error, so this is unreachable with an empty report
                report.add_error("(root)", "incomplete pipeline definition");
                Err(report)
            }
        }
    }
}

fn validate_tables(obj: &Map<String, Value>, report: &mut ValidationReport) -> Option<Vec<TableDefinition>> {
    debug!("validate_tables: called");
    let entries = match obj.get("tables") {
        None | Some(Value::Null) => {
            report.add_error("tables", "field required");
            return None;
        }
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            report.add_error("tables", format!("expected a list, got {}", type_name(other)));
            return None;
        }
    };

    if entries.is_empty() {
        report.add_error("tables", "must contain at least one table");
        return None;
    }

    let mut tables = Vec::with_capacity(entries.len());
    let mut all_valid = true;
    for (i, entry) in entries.iter().enumerate() {
        let prefix = format!("tables[{}]", i);
        let Some(table) = entry.as_object() else {
            report.add_error(&prefix, format!("expected an object, got {}", type_name(entry)));
            all_valid = false;
            continue;
        };

        let name = required_string(table, &["name"], &format!("{}.name", prefix), report);
        let description = optional_string(table, "description", &format!("{}.description", prefix), report);
        let query = required_string(table, &["query"], &format!("{}.query", prefix), report);

        match (name, description, query) {
            (Some(name), Ok(description), Some(query)) => tables.push(TableDefinition::new(name, description, query)),
            _ => all_valid = false,
        }
    }

    all_valid.then_some(tables)
}

/// Look up the first present key among `keys` (canonical name first, then aliases)
fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn required_string(
    obj: &Map<String, Value>,
    keys: &[&str],
    path: &str,
    report: &mut ValidationReport,
) -> Option<String> {
    match lookup(obj, keys) {
        None | Some(Value::Null) => {
            report.add_error(path, "field required");
            None
        }
        Some(Value::String(s)) if s.is_empty() => {
            report.add_error(path, "must not be empty");
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            report.add_error(path, format!("expected a string, got {}", type_name(other)));
            None
        }
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    report: &mut ValidationReport,
) -> Result<Option<String>, ()> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => {
            report.add_error(path, format!("expected a string, got {}", type_name(other)));
            Err(())
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
