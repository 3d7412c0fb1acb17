//! RequestOrchestrator - one request in, one outcome out
//!
//! Steps, strictly in order, stopping at the first failure:
//! 1. render the generation prompt
//! 2. call the model (with a per-call timeout)
//! 3. parse the response as JSON
//! 4. validate it into a `PipelineDefinition`
//! 5. render the pipeline source
//! 6. run the safety analyzer on the source
//! 7. render the deployment settings
//! 8. parse the settings and assemble the outcome

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::{Value, json};
use tracing::{Instrument, Span, debug, error, info, info_span};
use uuid::Uuid;

use super::AgentError;
use crate::config::{Config, EnvironmentConfig, PipelineTemplate};
use crate::domain::{BatchRecord, PipelineDefinition, RequestOutcome};
use crate::llm::{LlmClient, LlmError};
use crate::prompts::{self, PromptLoader, TemplateRenderer};
use crate::tools::ToolRegistry;
use crate::validation::{CodeSafetyAnalyzer, SafetyRules, SchemaValidator};

/// Execution identity used when none is configured
const DEFAULT_RUN_AS: &str = "agent";

/// Workspace folder the generated notebooks are deployed under
const NOTEBOOK_ROOT: &str = "/Workspace/Shared/pipelines";

/// Deployment values passed to the settings template
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentContext {
    pub run_as: String,
    pub template: Option<Value>,
    pub environment: Option<Value>,
}

impl Default for DeploymentContext {
    fn default() -> Self {
        Self {
            run_as: DEFAULT_RUN_AS.to_string(),
            template: None,
            environment: None,
        }
    }
}

impl DeploymentContext {
    /// Resolve the selected template and environment from config
    pub fn from_config(config: &Config) -> Self {
        debug!("DeploymentContext::from_config: called");
        Self {
            run_as: config.deployment.run_as.clone(),
            template: config.selected_template().map(template_values),
            environment: config.selected_environment().map(environment_values),
        }
    }
}

/// Cluster settings of the selected template
///
/// The template's `target-schema` is left out: `target` always comes from the
/// validated definition.
fn template_values(template: &PipelineTemplate) -> Value {
    json!({
        "cluster_id": template.cluster_id,
        "edition": template.edition,
    })
}

fn environment_values(environment: &EnvironmentConfig) -> Value {
    json!({
        "catalog": environment.catalog_name,
        "volume_path": environment.volume_path,
    })
}

/// Sequences the per-request pipeline and fans out batches
pub struct RequestOrchestrator {
    llm: Arc<dyn LlmClient>,
    renderer: Arc<dyn TemplateRenderer>,
    validator: SchemaValidator,
    analyzer: CodeSafetyAnalyzer,
    tool_definitions: Vec<Value>,
    deployment: DeploymentContext,
    model_timeout: Duration,
    max_concurrency: usize,
    span: Span,
}

impl RequestOrchestrator {
    /// Create an orchestrator with default rules, no tools and no deployment profile
    pub fn new(llm: Arc<dyn LlmClient>, renderer: Arc<dyn TemplateRenderer>, span: Span) -> Self {
        debug!("RequestOrchestrator::new: called");
        let validator = SchemaValidator::new(info_span!(parent: &span, "schema_validator"));
        let analyzer = CodeSafetyAnalyzer::new(
            Arc::new(SafetyRules::default()),
            info_span!(parent: &span, "code_safety"),
        );
        Self {
            llm,
            renderer,
            validator,
            analyzer,
            tool_definitions: Vec::new(),
            deployment: DeploymentContext::default(),
            model_timeout: Duration::from_secs(120),
            max_concurrency: 4,
            span,
        }
    }

    /// Wire everything up from loaded configuration
    pub fn from_config(config: &Config, llm: Arc<dyn LlmClient>) -> Self {
        let span = info_span!("orchestrator", model = %config.model.name);
        debug!("RequestOrchestrator::from_config: called");
        let renderer = Arc::new(PromptLoader::new(
            config.templates.dir.clone(),
            info_span!(parent: &span, "templates"),
        ));
        let analyzer = CodeSafetyAnalyzer::new(
            Arc::new(SafetyRules::from_config(&config.safety)),
            info_span!(parent: &span, "code_safety"),
        );
        let tools = ToolRegistry::from_descriptors(&config.tools, &analyzer);

        let mut orchestrator = Self::new(llm, renderer, span)
            .with_analyzer(analyzer)
            .with_tools(&tools)
            .with_deployment(DeploymentContext::from_config(config))
            .with_model_timeout(Duration::from_millis(config.model.timeout_ms));
        orchestrator.max_concurrency = config.concurrency.max_requests.max(1);
        orchestrator
    }

    pub fn with_analyzer(mut self, analyzer: CodeSafetyAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Offer these tools to the model in the generation prompt
    pub fn with_tools(mut self, tools: &ToolRegistry) -> Self {
        self.tool_definitions = tools.definitions();
        self
    }

    pub fn with_deployment(mut self, deployment: DeploymentContext) -> Self {
        self.deployment = deployment;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Handle one request; never fails, errors become `{"error": ...}` outcomes
    pub async fn handle(&self, raw_request: &str) -> RequestOutcome {
        let request_id = Uuid::now_v7();
        let span = info_span!(parent: &self.span, "request", %request_id);

        async {
            debug!(request_len = %raw_request.len(), "RequestOrchestrator::handle: called");
            match self.run(raw_request).await {
                Ok((code, pipeline_config)) => {
                    info!("Request handled");
                    RequestOutcome::generated(code, pipeline_config)
                }
                Err(e) => {
                    error!("Error handling request: {}", e);
                    RequestOutcome::failed(e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Handle a batch concurrently; outcomes are JSON-encoded, in input order
    ///
    /// Each request runs in its own task, so a failure or panic in one cannot
    /// disturb the others. At most `max_concurrency` requests are in flight.
    pub async fn handle_batch(self: Arc<Self>, records: Vec<BatchRecord>) -> Vec<String> {
        info!(count = %records.len(), max_concurrency = %self.max_concurrency, "Handling batch");
        let max_concurrency = self.max_concurrency;

        futures::stream::iter(records)
            .map(|record| {
                let this = Arc::clone(&self);
                tokio::spawn(async move { this.handle_record(&record).await })
            })
            .buffered(max_concurrency)
            .map(|joined| match joined {
                Ok(outcome) => outcome.to_json(),
                Err(e) => {
                    error!("Request task failed: {}", e);
                    RequestOutcome::failed(format!("Request task failed: {}", e)).to_json()
                }
            })
            .collect::<Vec<_>>()
            .await
    }

    async fn handle_record(&self, record: &BatchRecord) -> RequestOutcome {
        match record.request_text() {
            Some(text) => self.handle(text).await,
            None => {
                debug!("handle_record: no request text");
                RequestOutcome::failed(AgentError::MissingInput.to_string())
            }
        }
    }

    async fn run(&self, raw_request: &str) -> Result<(String, Value), AgentError> {
        if raw_request.trim().is_empty() {
            return Err(AgentError::MissingInput);
        }

        let prompt = self.render(
            prompts::GENERATE_PIPELINE,
            &json!({
                "user_request": raw_request,
                "tools": self.tool_definitions,
            }),
        )?;

        debug!(prompt_len = %prompt.len(), "run: calling model");
        let response = tokio::time::timeout(self.model_timeout, self.llm.generate(&prompt))
            .await
            .map_err(|_| LlmError::Timeout(self.model_timeout))??;

        let parsed: Value =
            serde_json::from_str(&response).map_err(|_| AgentError::ResponseFormat { raw: response.clone() })?;

        let pipeline = self.validator.validate(&parsed).map_err(AgentError::RequestValidation)?;
        info!(
            pipeline = %pipeline.pipeline_name(),
            tables = %pipeline.tables().len(),
            "Validated pipeline definition"
        );

        let code = self.render(prompts::DLT_PIPELINE, &json!({ "pipeline": pipeline }))?;

        let report = self.analyzer.analyze(&code);
        if !report.is_empty() {
            debug!(violations = %report.len(), "run: generated code rejected");
            return Err(AgentError::CodeIntegrity(report));
        }

        let rendered = self.render(prompts::PIPELINE_CONFIG, &self.config_values(&pipeline))?;
        let pipeline_config: Value =
            serde_json::from_str(&rendered).map_err(|source| AgentError::ConfigRender { rendered, source })?;

        Ok((code, pipeline_config))
    }

    fn render(&self, name: &str, values: &Value) -> Result<String, AgentError> {
        self.renderer
            .render(name, values)
            .map_err(|e| AgentError::Template(format!("{:#}", e)))
    }

    fn config_values(&self, pipeline: &PipelineDefinition) -> Value {
        json!({
            "pipeline": pipeline,
            "current_user": self.deployment.run_as,
            "template": self.deployment.template,
            "environment": self.deployment.environment,
            "notebook_path": format!("{}/{}", NOTEBOOK_ROOT, pipeline.pipeline_name()),
        })
    }
}
