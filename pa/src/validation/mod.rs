//! Validation of model output and generated code
//!
//! - [`schema`]: structural validation of the model's JSON into a `PipelineDefinition`
//! - [`safety`]: static analysis of generated Python for forbidden calls
//! - [`syntax`]: tree-sitter parsing and lowering used by the safety analyzer

pub mod safety;
pub mod schema;
pub mod syntax;

pub use safety::{CodeSafetyAnalyzer, DEFAULT_FORBIDDEN_CALLS, DEFAULT_RECOGNIZED_DECORATORS, SafetyReport, SafetyRules};
pub use schema::{FieldError, SchemaValidator, ValidationReport};
pub use syntax::{Module, SyntaxError, SyntaxNode, parse_module};
