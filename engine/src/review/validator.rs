//! Validator agent
//!
//! Code-quality reviewer: scans the source text for debug leftovers,
//! oversized lines, and other hygiene problems, and produces a structured
//! verdict with per-line findings.

use crate::review::{run_checks, Check};
use async_trait::async_trait;
use sdk::agent::{Agent, AgentContext};
use sdk::errors::EngineError;
use sdk::types::{AgentConfig, ReviewVerdict, Severity, Violation};
use serde_json::Value;
use tracing::debug;

/// Maximum line length tolerated by the long-line check
const MAX_LINE_LENGTH: usize = 120;

/// Code-quality reviewer agent.
pub struct ValidatorAgent {
    config: AgentConfig,
    checks: Vec<Check>,
}

impl ValidatorAgent {
    /// Registry name of the validator.
    pub const NAME: &'static str = "validator";

    pub fn new(config: AgentConfig) -> Self {
        let checks = vec![
            Check::new(
                "no-debug-statements",
                Severity::Warning,
                r"(\bdbg!\(|\bconsole\.log\(|\bprintln!\()",
                "Debug output left in source",
            ),
            Check::new(
                "no-todo-comments",
                Severity::Info,
                r"\b(TODO|FIXME|XXX)\b",
                "Unresolved TODO/FIXME marker",
            ),
            Check::new(
                "no-unwrap",
                Severity::Warning,
                r"\.unwrap\(\)",
                "unwrap() can panic; propagate the error instead",
            ),
            Check::new(
                "no-trailing-whitespace",
                Severity::Info,
                r"\S[ \t]+$",
                "Trailing whitespace",
            ),
        ];

        Self { config, checks }
    }

    /// The full battery against one file's content.
    fn review(&self, code: &str) -> ReviewVerdict {
        let mut violations = run_checks(&self.checks, code);

        // Line-length check needs the raw length, not a pattern
        for (index, line) in code.lines().enumerate() {
            if line.len() > MAX_LINE_LENGTH {
                violations.push(Violation {
                    rule: "no-long-lines".to_string(),
                    severity: Severity::Info,
                    line: Some(index + 1),
                    message: format!("Line exceeds {} characters", MAX_LINE_LENGTH),
                });
            }
        }

        ReviewVerdict::from_violations(violations, self.checks.len() + 1)
    }
}

#[async_trait]
impl Agent for ValidatorAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Vec<String> {
        vec![
            "code-validation".to_string(),
            "style-checking".to_string(),
        ]
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<Value, EngineError> {
        let code = ctx
            .code_content
            .as_deref()
            .ok_or_else(|| EngineError::Agent {
                agent: Self::NAME.to_string(),
                message: "context has no code content to validate".to_string(),
            })?;

        debug!(
            "Validating {} ({} bytes)",
            ctx.file_name.as_deref().unwrap_or("<unnamed>"),
            code.len()
        );

        let verdict = self.review(code);
        serde_json::to_value(&verdict).map_err(|e| EngineError::Agent {
            agent: Self::NAME.to_string(),
            message: format!("failed to serialize verdict: {}", e),
        })
    }
}
