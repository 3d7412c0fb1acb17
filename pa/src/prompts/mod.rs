//! Template System
//!
//! Renders the generation prompt, the pipeline source and the deployment
//! settings from `.hbs` templates.
//!
//! Template loading chain:
//! 1. `<templates.dir>/{name}.hbs` (user override)
//! 2. Embedded fallback in code
//! 3. A `Prompt for {name} with context {...}` placeholder
//!
//! Templates use Handlebars syntax with HTML escaping disabled. The `json`
//! helper writes a value as a JSON literal, which is also a valid Python
//! string literal for the values the templates use it on.

pub mod embedded;
mod loader;

pub use loader::{PromptLoader, TemplateRenderer};

/// Template names used by the orchestrator
pub const GENERATE_PIPELINE: &str = "generate_pipeline";
pub const DLT_PIPELINE: &str = "dlt_pipeline.py";
pub const PIPELINE_CONFIG: &str = "pipeline_config.json";
