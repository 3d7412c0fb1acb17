//! pipeagent configuration types and loading
//!
//! The configuration is loaded once at startup and shared read-only afterwards.
//! Any problem with the file is fatal: there is no fallback to built-in defaults
//! for a missing or malformed file.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::tools::ToolKind;
use crate::validation::{DEFAULT_FORBIDDEN_CALLS, DEFAULT_RECOGNIZED_DECORATORS};

/// Project-local config file name
const LOCAL_CONFIG: &str = ".pipeagent.yml";

/// Errors loading or validating configuration; all of them stop the process
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config file found (tried: {tried})")]
    NotFound { tried: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Main pipeagent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Language model parameters
    pub model: ModelConfig,

    /// Tools offered to the model
    pub tools: Vec<ToolDescriptor>,

    /// Named pipeline templates (cluster and edition settings)
    pub pipeline_templates: BTreeMap<String, PipelineTemplate>,

    /// Named deployment environments
    pub environments: BTreeMap<String, EnvironmentConfig>,

    /// Safety rule sets for generated code
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Batch concurrency limits
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Which template/environment to deploy with
    #[serde(default)]
    pub deployment: DeploymentConfig,

    /// Template lookup configuration
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration, trying in order:
    /// 1. the explicit path, if given
    /// 2. `.pipeagent.yml` in the working directory
    /// 3. `~/.config/pipeagent/pipeagent.yml`
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self, ConfigError> {
        debug!(?config_path, "Config::load: called");
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let mut tried = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(config_dir) = dirs::config_dir() {
            tried.push(config_dir.join("pipeagent").join("pipeagent.yml"));
        }

        for candidate in &tried {
            if candidate.exists() {
                debug!(path = %candidate.display(), "Config::load: found config file");
                return Self::load_from_file(candidate);
            }
        }

        let tried = tried.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ");
        Err(ConfigError::NotFound { tried })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Config::load_from_file: called");
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&content, path)?;
        tracing::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Parse and validate YAML content
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<inline>"))
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!("Config::validate: called");
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::Invalid("model.name must not be empty".to_string()));
        }

        if self.concurrency.max_requests == 0 {
            return Err(ConfigError::Invalid(
                "concurrency.max-requests must be at least 1".to_string(),
            ));
        }

        if let Some(template) = &self.deployment.template
            && !self.pipeline_templates.contains_key(template)
        {
            return Err(ConfigError::Invalid(format!(
                "deployment.template '{}' is not defined in pipeline-templates",
                template
            )));
        }

        if let Some(environment) = &self.deployment.environment
            && !self.environments.contains_key(environment)
        {
            return Err(ConfigError::Invalid(format!(
                "deployment.environment '{}' is not defined in environments",
                environment
            )));
        }

        Ok(())
    }

    /// Pipeline template selected for deployment, if any
    pub fn selected_template(&self) -> Option<&PipelineTemplate> {
        self.deployment
            .template
            .as_ref()
            .and_then(|name| self.pipeline_templates.get(name))
    }

    /// Environment selected for deployment, if any
    pub fn selected_environment(&self) -> Option<&EnvironmentConfig> {
        self.deployment
            .environment
            .as_ref()
            .and_then(|name| self.environments.get(name))
    }
}

/// Language model provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Deterministic canned responses, no network
    #[default]
    Offline,
    /// OpenAI-compatible Chat Completions endpoint
    OpenAI,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

/// Language model parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModelConfig {
    /// Model or serving endpoint name
    pub name: String,

    #[serde(default)]
    pub provider: Provider,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// API base URL (openai provider)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable containing the API key (openai provider)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ModelConfig {
    /// Minimal config for the given model name with every default applied
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: Provider::default(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ConfigError> {
        debug!(api_key_env = %self.api_key_env, "ModelConfig::api_key: called");
        std::env::var(&self.api_key_env).map_err(|_| {
            ConfigError::Invalid(format!(
                "LLM API key not found. Set the {} environment variable.",
                self.api_key_env
            ))
        })
    }
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_ms() -> u64 {
    120_000
}

/// A tool entry: a known tool name plus free-form settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: ToolKind,

    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_yaml::Value>,
}

/// Named pipeline template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineTemplate {
    /// Informational; generated settings always target the definition's `target_schema`
    pub target_schema: String,
    pub cluster_id: String,
    pub edition: String,
}

/// Named deployment environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnvironmentConfig {
    pub catalog_name: String,
    pub volume_path: String,
}

/// Safety rule sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SafetyConfig {
    /// Dotted call names that fail the safety check
    pub forbidden_calls: Vec<String>,

    /// Decorators that mark pipeline tables and views
    pub recognized_decorators: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            forbidden_calls: DEFAULT_FORBIDDEN_CALLS.iter().map(|s| s.to_string()).collect(),
            recognized_decorators: DEFAULT_RECOGNIZED_DECORATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Batch concurrency limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConcurrencyConfig {
    /// Maximum requests in flight at once (bounded by what the model endpoint tolerates)
    pub max_requests: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { max_requests: 4 }
    }
}

/// Deployment profile selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DeploymentConfig {
    /// Key into `pipeline-templates`
    pub template: Option<String>,

    /// Key into `environments`
    pub environment: Option<String>,

    /// Execution identity written into the pipeline settings
    pub run_as: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            template: None,
            environment: None,
            run_as: "agent".to_string(),
        }
    }
}

/// Template lookup configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TemplatesConfig {
    /// Directory searched for `<name>.hbs` before the embedded templates
    pub dir: Option<PathBuf>,
}
