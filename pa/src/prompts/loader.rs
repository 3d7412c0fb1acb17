//! Template loader and renderer
//!
//! Loads templates from an override directory or falls back to the embedded
//! defaults, then renders them with Handlebars.

use std::path::PathBuf;

use eyre::{Result, eyre};
use handlebars::{Handlebars, handlebars_helper};
use serde_json::Value;
use tracing::{Span, debug, info_span, warn};

use super::embedded;

/// Renders a named template with a set of named values
pub trait TemplateRenderer: Send + Sync {
    /// Render `name` with `values`
    ///
    /// A template that cannot be found renders as a diagnostic placeholder
    /// instead of failing; a template that fails to render is an error.
    fn render(&self, name: &str, values: &Value) -> Result<String>;
}

handlebars_helper!(json: |v: Json| serde_json::to_string(v).unwrap_or_default());

/// Template loader with fallback chain
pub struct PromptLoader {
    /// Override directory (`<dir>/<name>.hbs`)
    dir: Option<PathBuf>,

    hbs: Handlebars<'static>,

    span: Span,
}

impl PromptLoader {
    /// Create a loader that checks `dir` before the embedded templates
    pub fn new(dir: Option<PathBuf>, span: Span) -> Self {
        debug!(?dir, "PromptLoader::new: called");
        let mut hbs = Handlebars::new();
        // Output is Python and JSON, never HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.register_helper("json", Box::new(json));

        Self { dir, hbs, span }
    }

    /// Create a loader that only uses embedded templates
    pub fn embedded_only() -> Self {
        Self::new(None, info_span!("templates"))
    }

    /// Load template source by name; Ok(None) when it exists nowhere
    pub fn load_template(&self, name: &str) -> Result<Option<String>> {
        debug!(%name, "PromptLoader::load_template: called");

        if let Some(ref dir) = self.dir {
            let path = dir.join(format!("{}.hbs", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in override directory");
                return std::fs::read_to_string(&path)
                    .map(Some)
                    .map_err(|e| eyre!("Failed to read template {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in override directory");
        }

        Ok(embedded::get_embedded(name).map(str::to_string))
    }
}

impl TemplateRenderer for PromptLoader {
    fn render(&self, name: &str, values: &Value) -> Result<String> {
        let _guard = self.span.enter();
        debug!(%name, "PromptLoader::render: called");

        let Some(template) = self.load_template(name)? else {
            warn!(%name, "Template not found, rendering placeholder");
            return Ok(format!("Prompt for {} with context {}", name, values));
        };

        self.hbs
            .render_template(&template, values)
            .map_err(|e| eyre!("Failed to render template {}: {}", name, e))
    }
}
