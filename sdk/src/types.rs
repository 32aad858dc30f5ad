//! Workflow and outcome types
//!
//! Shared data model for the orchestrator and agents: agent configuration,
//! workflow definitions, per-agent outcomes, and the structured verdict
//! produced by reviewer agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-agent execution configuration.
///
/// Immutable once the agent is registered. The orchestrator's supervising
/// wrapper reads it to enforce timeouts, retries and dependency checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Timeout for a single execution attempt in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of retries after a failed attempt (0 = exactly one attempt)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Scheduling priority, 1-10 (lower runs earlier in listings only;
    /// execution order is defined by the workflow)
    #[serde(default = "default_priority")]
    pub priority: u8,

    /// Declared dependencies checked before every execution attempt
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            priority: default_priority(),
            dependencies: Vec::new(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_priority() -> u8 {
    5
}

/// A dependency an agent declares it needs before it can execute.
///
/// A check that itself fails (unreadable path, broken environment) counts
/// as "not satisfied" rather than propagating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "lowercase")]
pub enum Dependency {
    /// A file that must exist on disk
    File(String),

    /// An environment variable that must be set
    Env(String),

    /// An external command assumed available (not probed)
    Command(String),
}

impl Dependency {
    /// Check whether the dependency is currently satisfied.
    pub fn is_satisfied(&self) -> bool {
        match self {
            Self::File(path) => std::fs::metadata(path).is_ok(),
            Self::Env(var) => std::env::var(var).is_ok(),
            Self::Command(_) => true,
        }
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path),
            Self::Env(var) => write!(f, "env:{}", var),
            Self::Command(cmd) => write!(f, "command:{}", cmd),
        }
    }
}

/// How a workflow runs its agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// All agents in flight concurrently; failures never cancel siblings
    Parallel,

    /// One agent at a time in list order, accumulating outputs
    Sequential,
}

/// A named, ordered composition of agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique workflow name
    pub name: String,

    /// Ordered agent names; every name must be registered before execution
    pub agents: Vec<String>,

    /// Execution mode; `None` falls back to the orchestrator default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,

    /// Per-workflow timeout override in milliseconds (per attempt)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Sequential mode only: keep running after a failing agent.
    /// `None` means the default of continuing, so the memory agent can
    /// still record a partial failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_failure: Option<bool>,
}

impl WorkflowDefinition {
    /// Create a sequential workflow over the given agents.
    pub fn sequential(name: impl Into<String>, agents: Vec<String>) -> Self {
        Self {
            name: name.into(),
            agents,
            mode: Some(ExecutionMode::Sequential),
            timeout_ms: None,
            continue_on_failure: None,
        }
    }

    /// Create a parallel workflow over the given agents.
    pub fn parallel(name: impl Into<String>, agents: Vec<String>) -> Self {
        Self {
            name: name.into(),
            agents,
            mode: Some(ExecutionMode::Parallel),
            timeout_ms: None,
            continue_on_failure: None,
        }
    }
}

/// Lifecycle state of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowState {
    /// Whether the state is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// The recorded outcome of one agent within one workflow run.
///
/// Exactly one of `data` / `error` is set. A failed agent occupies its own
/// slot in the results map without failing the owning workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    /// Whether the agent reached a successful terminal outcome
    pub success: bool,

    /// The agent's result payload on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// The agent's final error message on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock duration of the terminal attempt chain in milliseconds
    pub duration_ms: u64,

    /// When the outcome was recorded
    pub timestamp: DateTime<Utc>,
}

impl AgentOutcome {
    /// Record a successful outcome.
    pub fn success(data: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    /// Record a failed outcome.
    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            duration_ms,
            timestamp: Utc::now(),
        }
    }
}

/// Severity of a single review finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One finding produced by a reviewer check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Stable rule identifier, e.g. "no-debug-statements"
    pub rule: String,

    /// How serious the finding is
    pub severity: Severity,

    /// 1-based line number where the finding was detected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// Human-readable description
    pub message: String,
}

/// Structured verdict produced by a reviewer agent's battery of checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewVerdict {
    /// Whether the battery ran to completion
    pub success: bool,

    /// "approve", "warn" or "reject"
    pub decision: String,

    /// Coarse quality rating, e.g. "Good"
    pub rating: String,

    /// All findings, ordered as detected
    pub violations: Vec<Violation>,

    /// Number of independent checks that ran
    pub checks_run: usize,

    /// One-line summary for reports
    pub summary: String,
}

impl ReviewVerdict {
    /// Derive decision and rating from the collected violations.
    pub fn from_violations(violations: Vec<Violation>, checks_run: usize) -> Self {
        let errors = violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
            .count();
        let warnings = violations
            .iter()
            .filter(|v| v.severity == Severity::Warning)
            .count();

        let (decision, rating) = if errors > 0 {
            ("reject", "Needs Work")
        } else if warnings > 0 {
            ("warn", "Good")
        } else {
            ("approve", "Excellent")
        };

        let summary = format!(
            "{} checks, {} violations ({} errors, {} warnings)",
            checks_run,
            violations.len(),
            errors,
            warnings
        );

        Self {
            success: true,
            decision: decision.to_string(),
            rating: rating.to_string(),
            violations,
            checks_run,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.timeout_ms, 60_000);
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.priority, 5);
        assert!(config.dependencies.is_empty());
    }

    #[test]
    fn test_dependency_env() {
        std::env::set_var("ARGUS_SDK_TEST_DEP", "1");
        assert!(Dependency::Env("ARGUS_SDK_TEST_DEP".into()).is_satisfied());
        assert!(!Dependency::Env("ARGUS_SDK_TEST_DEP_MISSING".into()).is_satisfied());
    }

    #[test]
    fn test_dependency_file_missing() {
        assert!(!Dependency::File("/definitely/not/a/real/path".into()).is_satisfied());
    }

    #[test]
    fn test_workflow_state_terminal() {
        assert!(WorkflowState::Completed.is_terminal());
        assert!(WorkflowState::Failed.is_terminal());
        assert!(WorkflowState::Cancelled.is_terminal());
        assert!(!WorkflowState::Pending.is_terminal());
        assert!(!WorkflowState::Running.is_terminal());
    }

    #[test]
    fn test_outcome_roundtrip() {
        let outcome = AgentOutcome::success(serde_json::json!({"ok": true}), 12);
        let json = serde_json::to_string(&outcome).unwrap();
        let back: AgentOutcome = serde_json::from_str(&json).unwrap();
        assert!(back.success);
        assert!(back.error.is_none());
        assert_eq!(back.duration_ms, 12);
    }

    #[test]
    fn test_verdict_decision() {
        let clean = ReviewVerdict::from_violations(vec![], 5);
        assert_eq!(clean.decision, "approve");

        let warned = ReviewVerdict::from_violations(
            vec![Violation {
                rule: "x".into(),
                severity: Severity::Warning,
                line: Some(1),
                message: "m".into(),
            }],
            5,
        );
        assert_eq!(warned.decision, "warn");

        let rejected = ReviewVerdict::from_violations(
            vec![Violation {
                rule: "x".into(),
                severity: Severity::Error,
                line: None,
                message: "m".into(),
            }],
            5,
        );
        assert_eq!(rejected.decision, "reject");
        assert_eq!(rejected.rating, "Needs Work");
    }
}
