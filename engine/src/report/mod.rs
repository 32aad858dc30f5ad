//! Report rendering
//!
//! Turns workflow reports into console, JSON, or markdown output, and
//! counts violations for strict-mode exit codes.

use crate::orchestrator::WorkflowReport;
use sdk::types::AgentOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;

/// Output format selected on the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!(
                "Unknown format '{}'. Use console, json or markdown",
                other
            )),
        }
    }
}

/// The review result for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReview {
    pub file: String,
    pub report: WorkflowReport,
}

/// Violations found in one agent outcome's verdict payload.
fn outcome_violations(outcome: &AgentOutcome) -> usize {
    outcome
        .data
        .as_ref()
        .and_then(|data| data.get("violations"))
        .and_then(Value::as_array)
        .map(|v| v.len())
        .unwrap_or(0)
}

/// Total violations across all files and agents; drives strict mode.
pub fn total_violations(reviews: &[FileReview]) -> usize {
    reviews
        .iter()
        .flat_map(|review| review.report.results.values())
        .map(outcome_violations)
        .sum()
}

/// Render reviews in the requested format.
pub fn render(reviews: &[FileReview], format: OutputFormat) -> String {
    match format {
        OutputFormat::Console => render_console(reviews),
        OutputFormat::Json => render_json(reviews),
        OutputFormat::Markdown => render_markdown(reviews),
    }
}

/// Per-agent status lines plus an aggregate pass/fail summary.
fn render_console(reviews: &[FileReview]) -> String {
    let mut out = String::new();

    for review in reviews {
        let _ = writeln!(out, "{}", review.file);

        for (agent, outcome) in &review.report.results {
            let status = if outcome.success { "ok" } else { "FAILED" };
            let violations = outcome_violations(outcome);
            let decision = outcome
                .data
                .as_ref()
                .and_then(|d| d.get("decision"))
                .and_then(Value::as_str)
                .unwrap_or("-");

            let _ = writeln!(
                out,
                "  {:<12} {:<7} {:<8} {} violation(s)  {}ms",
                agent, status, decision, violations, outcome.duration_ms
            );

            if let Some(error) = &outcome.error {
                let _ = writeln!(out, "               error: {}", error);
            }
        }
        let _ = writeln!(out);
    }

    let violations = total_violations(reviews);
    let verdict = if violations == 0 { "PASS" } else { "FAIL" };
    let _ = writeln!(
        out,
        "{}: {} file(s) reviewed, {} violation(s)",
        verdict,
        reviews.len(),
        violations
    );

    out
}

/// Machine-readable dump of everything.
fn render_json(reviews: &[FileReview]) -> String {
    serde_json::to_string_pretty(reviews).unwrap_or_else(|_| "[]".to_string())
}

/// Markdown report suitable for writing to a file.
fn render_markdown(reviews: &[FileReview]) -> String {
    let mut out = String::from("# Code Review Report\n\n");

    for review in reviews {
        let _ = writeln!(out, "## {}\n", review.file);
        let _ = writeln!(out, "| Agent | Status | Decision | Violations | Duration |");
        let _ = writeln!(out, "|-------|--------|----------|------------|----------|");

        for (agent, outcome) in &review.report.results {
            let status = if outcome.success { "ok" } else { "failed" };
            let decision = outcome
                .data
                .as_ref()
                .and_then(|d| d.get("decision"))
                .and_then(Value::as_str)
                .unwrap_or("-");

            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {}ms |",
                agent,
                status,
                decision,
                outcome_violations(outcome),
                outcome.duration_ms
            );
        }
        let _ = writeln!(out);

        // Expand individual findings under the table
        for (agent, outcome) in &review.report.results {
            let findings = outcome
                .data
                .as_ref()
                .and_then(|d| d.get("violations"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if findings.is_empty() {
                continue;
            }

            let _ = writeln!(out, "### {} findings\n", agent);
            for finding in findings {
                let line = finding
                    .get("line")
                    .and_then(Value::as_u64)
                    .map(|l| format!(" (line {})", l))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "- **{}**{}: {}",
                    finding.get("rule").and_then(Value::as_str).unwrap_or("?"),
                    line,
                    finding
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                );
            }
            let _ = writeln!(out);
        }
    }

    let violations = total_violations(reviews);
    let _ = writeln!(
        out,
        "**{}** - {} file(s), {} violation(s)",
        if violations == 0 { "PASS" } else { "FAIL" },
        reviews.len(),
        violations
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn review_with_violations(count: usize) -> FileReview {
        let violations: Vec<Value> = (0..count)
            .map(|i| json!({"rule": "r", "severity": "warning", "line": i + 1, "message": "m"}))
            .collect();

        let mut results = BTreeMap::new();
        results.insert(
            "validator".to_string(),
            AgentOutcome::success(
                json!({"decision": "warn", "violations": violations}),
                12,
            ),
        );

        FileReview {
            file: "src/lib.rs".to_string(),
            report: WorkflowReport {
                success: true,
                workflow_id: "code-review-1".to_string(),
                results,
                duration_ms: 20,
            },
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("console".parse::<OutputFormat>().unwrap(), OutputFormat::Console);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_total_violations() {
        let reviews = vec![review_with_violations(2), review_with_violations(3)];
        assert_eq!(total_violations(&reviews), 5);
    }

    #[test]
    fn test_console_summary_fail() {
        let output = render(&[review_with_violations(1)], OutputFormat::Console);
        assert!(output.contains("FAIL"));
        assert!(output.contains("validator"));
    }

    #[test]
    fn test_console_summary_pass() {
        let output = render(&[review_with_violations(0)], OutputFormat::Console);
        assert!(output.contains("PASS"));
    }

    #[test]
    fn test_markdown_contains_findings() {
        let output = render(&[review_with_violations(2)], OutputFormat::Markdown);
        assert!(output.contains("# Code Review Report"));
        assert!(output.contains("| validator |"));
        assert!(output.contains("(line 1)"));
    }

    #[test]
    fn test_json_roundtrips() {
        let output = render(&[review_with_violations(1)], OutputFormat::Json);
        let parsed: Vec<FileReview> = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.len(), 1);
    }
}
