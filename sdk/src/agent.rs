//! Agent trait and execution context
//!
//! This module defines the contract every agent must satisfy: identity,
//! capability list, configuration, and a single asynchronous
//! `execute(context)` entry point. The engine wraps each registered agent
//! in a supervisor that adds dependency validation, timeout enforcement,
//! retry-with-backoff and state/metrics tracking around that entry point.

use crate::errors::EngineError;
use crate::types::{AgentConfig, AgentOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum code content carried into stored/sanitized contexts
const MAX_STORED_CODE_LEN: usize = 5_000;

/// Trait that all agents must implement.
///
/// Failure is signaled by returning `Err`; the supervisor decides whether
/// to retry. Agents must be shareable across concurrent workflow runs, so
/// mutable internal state belongs behind interior mutability.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique agent name (the registry key)
    fn name(&self) -> &str;

    /// Capability tags for listings and diagnostics
    fn capabilities(&self) -> Vec<String>;

    /// Execution configuration (timeout, retries, priority, dependencies)
    fn config(&self) -> &AgentConfig;

    /// Whether this agent should receive the accumulated outputs of agents
    /// that ran before it in a sequential workflow. The memory agent opts
    /// in; reviewers do not.
    fn wants_workflow_results(&self) -> bool {
        false
    }

    /// Execute the agent against the given context.
    async fn execute(&self, ctx: &AgentContext) -> Result<serde_json::Value, EngineError>;
}

/// Which memory operation an [`AgentContext`] requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryAction {
    Store,
    Retrieve,
    Analyze,
    Learn,
    Optimize,
}

impl std::str::FromStr for MemoryAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STORE" => Ok(Self::Store),
            "RETRIEVE" => Ok(Self::Retrieve),
            "ANALYZE" => Ok(Self::Analyze),
            "LEARN" => Ok(Self::Learn),
            "OPTIMIZE" => Ok(Self::Optimize),
            other => Err(EngineError::UnknownAction(other.to_string())),
        }
    }
}

/// Temporal preference for memory retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePreference {
    #[default]
    Recent,
    Old,
    Any,
}

/// The context payload handed to an agent's `execute` call.
///
/// A single bag shared by reviewers (file name + content) and the memory
/// agent (action + operation-specific fields). Unused fields stay `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentContext {
    /// File under review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Kind of change being reviewed, e.g. "staged" or "comprehensive-review"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<String>,

    /// Source text under review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_content: Option<String>,

    /// Owning workflow instance id, set by the orchestrator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,

    /// When the run was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Memory operation selector; defaults to STORE when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<MemoryAction>,

    /// Payload for STORE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_to_store: Option<serde_json::Value>,

    /// Query string for RETRIEVE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Analysis kind for ANALYZE ("patterns", "performance", "quality",
    /// "trends", or anything else for the comprehensive report)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_type: Option<String>,

    /// Temporal preference for RETRIEVE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_preference: Option<TimePreference>,

    /// Accumulated outputs of agents that ran earlier in a sequential
    /// workflow, injected by the orchestrator for agents that opt in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_results: Option<BTreeMap<String, AgentOutcome>>,
}

impl AgentContext {
    /// Context for reviewing a single file.
    pub fn for_file(
        file_name: impl Into<String>,
        code_content: impl Into<String>,
        change_type: impl Into<String>,
    ) -> Self {
        Self {
            file_name: Some(file_name.into()),
            change_type: Some(change_type.into()),
            code_content: Some(code_content.into()),
            timestamp: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Context requesting a memory operation.
    pub fn for_action(action: MemoryAction) -> Self {
        Self {
            action: Some(action),
            timestamp: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Attach the owning workflow id.
    pub fn with_workflow_id(mut self, id: impl Into<String>) -> Self {
        self.workflow_id = Some(id.into());
        self
    }

    /// Attach accumulated workflow results.
    pub fn with_workflow_results(mut self, results: BTreeMap<String, AgentOutcome>) -> Self {
        self.workflow_results = Some(results);
        self
    }

    /// A copy safe for durable storage: large code content truncated,
    /// prior workflow results summarized away.
    pub fn sanitized(&self) -> Self {
        let mut copy = self.clone();
        if let Some(code) = &copy.code_content {
            if code.len() > MAX_STORED_CODE_LEN {
                let truncated: String = code.chars().take(MAX_STORED_CODE_LEN).collect();
                copy.code_content = Some(format!("{}...[truncated]", truncated));
            }
        }
        copy.workflow_results = None;
        copy
    }
}
