//! pipeagent - Natural-language to data-pipeline generator
//!
//! pipeagent asks a language model to design a Delta Live Tables pipeline from
//! a free-text request, validates the proposal, renders it into Python source
//! plus deployment settings, and statically checks the generated source before
//! handing it back.
//!
//! # Core Concepts
//!
//! - **Never trust the model**: its JSON is validated field by field before use
//! - **Check before returning**: generated code is parsed and scanned for forbidden calls
//! - **Failures are data**: every per-request failure becomes an `{"error": ...}` outcome
//! - **Batches are independent**: one bad request never affects another
//!
//! # Modules
//!
//! - [`agent`] - Request orchestration and batch handling
//! - [`validation`] - Schema validation and code safety analysis
//! - [`domain`] - Pipeline definitions and request outcomes
//! - [`llm`] - LLM client trait and providers
//! - [`prompts`] - Handlebars templates for prompts, code and settings
//! - [`tools`] - Tools offered to the model
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod agent;
pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod prompts;
pub mod tools;
pub mod validation;

// Re-export commonly used types
pub use agent::{AgentError, DeploymentContext, RequestOrchestrator};
pub use config::{Config, ConfigError, ModelConfig, Provider};
pub use domain::{BatchRecord, PipelineDefinition, RequestOutcome, TableDefinition};
pub use llm::{LlmClient, LlmError, OfflineClient, OpenAIClient, create_client};
pub use prompts::{PromptLoader, TemplateRenderer};
pub use tools::{Tool, ToolKind, ToolRegistry, ToolResult};
pub use validation::{CodeSafetyAnalyzer, SafetyReport, SafetyRules, SchemaValidator, ValidationReport};
