//! Static safety analysis of generated pipeline code
//!
//! A deliberately narrow, syntax-level check: it flags direct calls to a fixed
//! set of dangerous functions and notes whether any pipeline decorator is
//! present. Calls built dynamically (`getattr`, aliasing, string eval of
//! imports) are out of reach.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{Span, debug, info_span, warn};

use super::syntax::{SyntaxNode, parse_module};
use crate::config::SafetyConfig;

/// Calls that must never appear in generated code
pub const DEFAULT_FORBIDDEN_CALLS: &[&str] = &["os.system", "subprocess.call", "subprocess.Popen", "exec", "eval"];

/// Decorators that mark a function as a pipeline table or view
pub const DEFAULT_RECOGNIZED_DECORATORS: &[&str] = &["dlt.table", "dlt.view", "dlt.materialized_view"];

/// Name sets the analyzer checks against, loaded once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyRules {
    forbidden_calls: HashSet<String>,
    recognized_decorators: HashSet<String>,
}

impl Default for SafetyRules {
    fn default() -> Self {
        Self::new(
            DEFAULT_FORBIDDEN_CALLS.iter().map(|s| s.to_string()),
            DEFAULT_RECOGNIZED_DECORATORS.iter().map(|s| s.to_string()),
        )
    }
}

impl SafetyRules {
    pub fn new(
        forbidden_calls: impl IntoIterator<Item = String>,
        recognized_decorators: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            forbidden_calls: forbidden_calls.into_iter().collect(),
            recognized_decorators: recognized_decorators.into_iter().collect(),
        }
    }

    pub fn from_config(config: &SafetyConfig) -> Self {
        debug!(
            forbidden = %config.forbidden_calls.len(),
            recognized = %config.recognized_decorators.len(),
            "SafetyRules::from_config: called"
        );
        Self::new(
            config.forbidden_calls.iter().cloned(),
            config.recognized_decorators.iter().cloned(),
        )
    }

    pub fn is_forbidden(&self, name: &str) -> bool {
        self.forbidden_calls.contains(name)
    }

    pub fn is_recognized_decorator(&self, name: &str) -> bool {
        self.recognized_decorators.contains(name)
    }
}

/// Violations found in one source text, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SafetyReport {
    violations: Vec<String>,
    /// Whether any recognized pipeline decorator was seen. Advisory only:
    /// it never turns into a violation.
    recognized_decorator_seen: bool,
}

impl SafetyReport {
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// True when the source passed
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn recognized_decorator_seen(&self) -> bool {
        self.recognized_decorator_seen
    }

    fn syntax_error(message: String) -> Self {
        Self {
            violations: vec![format!("Syntax Error: {}", message)],
            recognized_decorator_seen: false,
        }
    }
}

impl fmt::Display for SafetyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.violations)
    }
}

/// Parses generated Python and reports forbidden calls
#[derive(Debug, Clone)]
pub struct CodeSafetyAnalyzer {
    rules: Arc<SafetyRules>,
    span: Span,
}

impl Default for CodeSafetyAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(SafetyRules::default()), info_span!("code_safety"))
    }
}

impl CodeSafetyAnalyzer {
    pub fn new(rules: Arc<SafetyRules>, span: Span) -> Self {
        Self { rules, span }
    }

    pub fn rules(&self) -> &SafetyRules {
        &self.rules
    }

    /// Analyze `source`, returning every violation found
    pub fn analyze(&self, source: &str) -> SafetyReport {
        let _guard = self.span.enter();
        debug!(source_len = %source.len(), "CodeSafetyAnalyzer::analyze: called");

        let module = match parse_module(source) {
            Ok(module) => module,
            Err(e) => {
                debug!(error = %e, "CodeSafetyAnalyzer::analyze: syntax error");
                return SafetyReport::syntax_error(e.to_string());
            }
        };

        let report = self.walk(module.root());
        if !report.recognized_decorator_seen {
            warn!("Generated code has no recognized pipeline decorator");
        }
        debug!(violations = %report.len(), "CodeSafetyAnalyzer::analyze: complete");
        report
    }

    /// Depth-first walk with an explicit stack; children are pushed in reverse
    /// so they pop in source order.
    fn walk(&self, root: &SyntaxNode) -> SafetyReport {
        let mut report = SafetyReport::default();
        let mut stack: Vec<&SyntaxNode> = vec![root];

        while let Some(node) = stack.pop() {
            match node {
                SyntaxNode::Call { callee, arguments } => {
                    if let Some(name) = callee.dotted_name()
                        && self.rules.is_forbidden(&name)
                    {
                        debug!(%name, "CodeSafetyAnalyzer::walk: forbidden call");
                        report.violations.push(format!("Forbidden function call: {}", name));
                    }
                    stack.extend(arguments.iter().rev());
                    stack.push(callee);
                }
                SyntaxNode::FunctionDef {
                    name,
                    decorators,
                    body,
                    returns,
                } => {
                    for decorator in decorators {
                        if let Some(decorator_name) = decorator.decorator_name()
                            && self.rules.is_recognized_decorator(&decorator_name)
                        {
                            debug!(function = %name, decorator = %decorator_name, "CodeSafetyAnalyzer::walk: recognized decorator");
                            report.recognized_decorator_seen = true;
                        }
                    }
                    if let Some(returns) = returns {
                        stack.push(returns);
                    }
                    stack.extend(decorators.iter().rev());
                    stack.extend(body.iter().rev());
                }
                SyntaxNode::Attribute { base, .. } => stack.push(base),
                SyntaxNode::Name(_) => {}
                SyntaxNode::Other(children) => stack.extend(children.iter().rev()),
            }
        }

        report
    }
}
