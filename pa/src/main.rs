//! pipeagent - Natural-language to data-pipeline generator
//!
//! CLI entry point: loads config, wires the orchestrator and dispatches commands.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use pipeagent::agent::RequestOrchestrator;
use pipeagent::cli::{Cli, Command};
use pipeagent::config::Config;
use pipeagent::domain::{BatchRecord, RequestOutcome};
use pipeagent::llm::create_client;
use pipeagent::tools::ToolRegistry;
use pipeagent::validation::{CodeSafetyAnalyzer, SafetyRules};

fn setup_logging(level: &str) -> Result<()> {
    let level: tracing::Level = level
        .parse()
        .map_err(|_| eyre::eyre!("Invalid log level: {}", level))?;

    // stdout carries outcomes, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "INFO".to_string());
    setup_logging(&level).context("Failed to setup logging")?;

    info!(
        "pipeagent loaded config: provider={}, model={}",
        config.model.provider, config.model.name
    );

    // Dispatch command
    match cli.command {
        Command::Generate { request } => cmd_generate(&config, &request).await,
        Command::Batch { file } => cmd_batch(&config, file.as_deref()).await,
        Command::Check { file } => cmd_check(&config, &file),
        Command::Tools => cmd_tools(&config),
    }
}

fn build_orchestrator(config: &Config) -> Result<RequestOrchestrator> {
    let llm = create_client(&config.model).context("Failed to create LLM client")?;
    Ok(RequestOrchestrator::from_config(config, llm))
}

/// Handle one request
async fn cmd_generate(config: &Config, request: &str) -> Result<ExitCode> {
    let orchestrator = build_orchestrator(config)?;
    let outcome = orchestrator.handle(request).await;

    if let Some(error) = outcome.error() {
        eprintln!("{} {}", "error:".red().bold(), error);
    }
    println!("{}", outcome.to_json());
    Ok(ExitCode::SUCCESS)
}

/// Handle a JSON-lines batch from a file or stdin
async fn cmd_batch(config: &Config, file: Option<&Path>) -> Result<ExitCode> {
    let lines = match file {
        Some(path) => {
            let file = fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            read_lines(BufReader::new(file))?
        }
        None => read_lines(io::stdin().lock())?,
    };

    let parsed: Vec<Result<BatchRecord, String>> = lines.iter().map(|line| parse_record(line)).collect();
    let records: Vec<BatchRecord> = parsed.iter().filter_map(|r| r.as_ref().ok().cloned()).collect();
    info!(lines = %lines.len(), records = %records.len(), "Read batch input");

    let orchestrator = Arc::new(build_orchestrator(config)?);
    let mut outcomes = orchestrator.handle_batch(records).await.into_iter();

    // Malformed lines keep their position in the output
    for record in parsed {
        let line = match record {
            Ok(_) => outcomes
                .next()
                .unwrap_or_else(|| RequestOutcome::failed("Missing batch outcome").to_json()),
            Err(error) => RequestOutcome::failed(error).to_json(),
        };
        println!("{}", line);
    }
    Ok(ExitCode::SUCCESS)
}

fn read_lines(reader: impl BufRead) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read batch input")?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

fn parse_record(line: &str) -> Result<BatchRecord, String> {
    serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "Skipping malformed batch record");
        format!("Invalid batch record: {}", e)
    })
}

/// Run the safety analyzer on a file; exit 1 on violations
fn cmd_check(config: &Config, file: &Path) -> Result<ExitCode> {
    let source = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let analyzer = CodeSafetyAnalyzer::new(
        Arc::new(SafetyRules::from_config(&config.safety)),
        tracing::info_span!("code_safety", file = %file.display()),
    );

    let report = analyzer.analyze(&source);
    debug!(violations = %report.len(), "cmd_check: analysis complete");

    if report.is_empty() {
        println!("{} {}", "✓".green(), file.display());
        if !report.recognized_decorator_seen() {
            println!("  {} no recognized pipeline decorator", "note:".yellow());
        }
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {}", "✗".red(), file.display());
    for violation in report.violations() {
        println!("  {}", violation);
    }
    Ok(ExitCode::from(1))
}

/// List configured tools
fn cmd_tools(config: &Config) -> Result<ExitCode> {
    let registry = ToolRegistry::from_descriptors(&config.tools, &CodeSafetyAnalyzer::default());

    if registry.is_empty() {
        println!("No tools configured.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "Configured tools:".bold());
    for definition in registry.definitions() {
        let name = definition["name"].as_str().unwrap_or_default();
        let description = definition["description"].as_str().unwrap_or_default();
        println!("  {:<24} {}", name.cyan(), description);
    }
    Ok(ExitCode::SUCCESS)
}
