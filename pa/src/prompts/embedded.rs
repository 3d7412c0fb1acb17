//! Embedded templates
//!
//! These are compiled into the binary from .hbs files at build time.

use tracing::debug;

/// Prompt asking the model for a pipeline definition as JSON
pub const GENERATE_PIPELINE: &str = include_str!("../../prompts/generate_pipeline.hbs");

/// Python source of the generated pipeline
pub const DLT_PIPELINE: &str = include_str!("../../prompts/dlt_pipeline.py.hbs");

/// Pipeline deployment settings (JSON)
pub const PIPELINE_CONFIG: &str = include_str!("../../prompts/pipeline_config.json.hbs");

/// Get the embedded template by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "generate_pipeline" => Some(GENERATE_PIPELINE),
        "dlt_pipeline.py" => Some(DLT_PIPELINE),
        "pipeline_config.json" => Some(PIPELINE_CONFIG),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
