//! Guardian agent
//!
//! Architecture and security reviewer: watches for boundary-crossing
//! imports, dynamic code execution, and credentials committed to source.
//! Findings carry error severity more often than the validator's; a
//! guardian rejection is meant to block.

use crate::review::{run_checks, Check};
use async_trait::async_trait;
use sdk::agent::{Agent, AgentContext};
use sdk::errors::EngineError;
use sdk::types::{AgentConfig, ReviewVerdict, Severity, Violation};
use serde_json::Value;
use tracing::debug;

/// Files longer than this trip the size check
const MAX_FILE_LINES: usize = 500;

/// Architecture and security reviewer agent.
pub struct GuardianAgent {
    config: AgentConfig,
    checks: Vec<Check>,
}

impl GuardianAgent {
    /// Registry name of the guardian.
    pub const NAME: &'static str = "guardian";

    pub fn new(config: AgentConfig) -> Self {
        let checks = vec![
            Check::new(
                "no-deep-relative-imports",
                Severity::Warning,
                r"(\.\./){3,}",
                "Deep relative import crosses module boundaries",
            ),
            Check::new(
                "no-dynamic-eval",
                Severity::Error,
                r"\beval\s*\(",
                "Dynamic code execution is forbidden",
            ),
            Check::new(
                "no-hardcoded-credentials",
                Severity::Error,
                r#"(?i)(api[_-]?key|password|secret)\s*[:=]\s*["'][^"']{4,}["']"#,
                "Credential committed to source",
            ),
            Check::new(
                "no-wildcard-imports",
                Severity::Info,
                r"use\s+[\w:]+::\*;",
                "Wildcard import hides the dependency surface",
            ),
        ];

        Self { config, checks }
    }

    fn review(&self, code: &str) -> ReviewVerdict {
        let mut violations = run_checks(&self.checks, code);

        let line_count = code.lines().count();
        if line_count > MAX_FILE_LINES {
            violations.push(Violation {
                rule: "max-file-length".to_string(),
                severity: Severity::Warning,
                line: None,
                message: format!(
                    "File has {} lines (limit {}); consider splitting",
                    line_count, MAX_FILE_LINES
                ),
            });
        }

        ReviewVerdict::from_violations(violations, self.checks.len() + 1)
    }
}

#[async_trait]
impl Agent for GuardianAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Vec<String> {
        vec![
            "architecture-review".to_string(),
            "security-scanning".to_string(),
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
                message: "context has no code content to guard".to_string(),
            })?;

        debug!(
            "Guarding {} ({} bytes)",
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

#[cfg(test)]
mod tests {
    use super::*;

    fn guardian() -> GuardianAgent {
        GuardianAgent::new(AgentConfig::default())
    }

    #[tokio::test]
    async fn test_hardcoded_credential_rejected() {
        let ctx = AgentContext::for_file(
            "config.rs",
            "let api_key = \"sk-0123456789abcdef\";\n",
            "test",
        );
        let result = guardian().execute(&ctx).await.unwrap();

        assert_eq!(result["decision"], "reject");
        assert!(result["violations"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v["rule"] == "no-hardcoded-credentials"));
    }

    #[tokio::test]
    async fn test_eval_rejected() {
        let ctx = AgentContext::for_file("script.js", "eval(userInput);\n", "test");
        let result = guardian().execute(&ctx).await.unwrap();

        assert_eq!(result["decision"], "reject");
    }

    #[tokio::test]
    async fn test_oversized_file_warned() {
        let code = "fn f() {}\n".repeat(MAX_FILE_LINES + 1);
        let ctx = AgentContext::for_file("big.rs", code, "test");
        let result = guardian().execute(&ctx).await.unwrap();

        assert!(result["violations"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v["rule"] == "max-file-length"));
    }

    #[tokio::test]
    async fn test_clean_file_approved() {
        let ctx = AgentContext::for_file("ok.rs", "pub fn fine() -> bool { true }\n", "test");
        let result = guardian().execute(&ctx).await.unwrap();

        assert_eq!(result["decision"], "approve");
    }
}
