//! Built-in reviewer agents
//!
//! Two concrete agents satisfy the execution contract: the validator
//! (code-quality checks) and the guardian (architecture and security
//! checks). Each runs a battery of independent pattern checks against the
//! source text under review and produces a structured verdict. The rule
//! content itself is intentionally small; the contract and the verdict
//! shape are what the orchestrator and the memory agent depend on.

pub mod guardian;
pub mod validator;

pub use guardian::GuardianAgent;
pub use validator::ValidatorAgent;

use regex::Regex;
use sdk::types::{Severity, Violation};

/// One independent pattern check in a reviewer's battery.
pub(crate) struct Check {
    pub rule: &'static str,
    pub severity: Severity,
    pub pattern: Regex,
    pub message: &'static str,
}

impl Check {
    pub(crate) fn new(
        rule: &'static str,
        severity: Severity,
        pattern: &str,
        message: &'static str,
    ) -> Self {
        Self {
            rule,
            severity,
            pattern: Regex::new(pattern).expect("static check pattern"),
            message,
        }
    }
}

/// Run every check against every line, collecting findings with 1-based
/// line numbers. Checks are independent: one check's findings never
/// affect another's.
pub(crate) fn run_checks(checks: &[Check], code: &str) -> Vec<Violation> {
    let mut violations = Vec::new();

    for check in checks {
        for (index, line) in code.lines().enumerate() {
            if check.pattern.is_match(line) {
                violations.push(Violation {
                    rule: check.rule.to_string(),
                    severity: check.severity,
                    line: Some(index + 1),
                    message: check.message.to_string(),
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_checks_reports_line_numbers() {
        let checks = vec![Check::new(
            "no-todo-comments",
            Severity::Info,
            r"\bTODO\b",
            "Leftover TODO comment",
        )];

        let code = "fn main() {\n    // TODO tidy this\n}\n";
        let violations = run_checks(&checks, code);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, Some(2));
        assert_eq!(violations[0].rule, "no-todo-comments");
    }

    #[test]
    fn test_checks_are_independent() {
        let checks = vec![
            Check::new("a", Severity::Warning, "alpha", "a"),
            Check::new("b", Severity::Error, "beta", "b"),
        ];

        let violations = run_checks(&checks, "alpha beta\n");
        assert_eq!(violations.len(), 2);
    }
}
