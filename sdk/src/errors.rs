//! Error types and handling
//!
//! This module provides the error types used throughout the Argus engine.
//! All errors implement the `ArgusErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! # Error Categories
//!
//! - **Configuration**: unknown workflows, unregistered agents, bad config
//! - **Dependency**: a declared agent dependency is unsatisfied
//! - **Timeout**: an execution attempt exceeded its deadline
//! - **Agent**: the agent's own execute call failed
//! - **Storage**: durable store read/write failures (logged and swallowed
//!   by callers; the in-memory state keeps operating)

use thiserror::Error;

/// Trait for Argus error extensions
///
/// Provides additional context for errors: a user-friendly hint that is
/// safe to print, and whether the error is worth retrying.
pub trait ArgusErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors typically require a configuration change.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// This enum represents all possible errors that can occur in the Argus
/// engine. Agent-level failures are isolated to their own slot in a
/// workflow's results map; only orchestration-level errors propagate to the
/// caller of `execute_workflow`.
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workflow not found: {0}")]
    UnknownWorkflow(String),

    #[error("No agents configured for workflow: {0}")]
    EmptyWorkflow(String),

    #[error("Missing agents: {0}")]
    MissingAgents(String),

    #[error("Agent must have a name and an execute method")]
    InvalidAgent,

    #[error("Agent already registered: {0}")]
    DuplicateAgent(String),

    // Agent execution errors
    #[error("Missing dependencies: {missing}")]
    MissingDependencies { agent: String, missing: String },

    #[error("Agent execution timeout after {timeout_ms}ms")]
    Timeout { agent: String, timeout_ms: u64 },

    #[error("Agent '{agent}' failed: {message}")]
    Agent { agent: String, message: String },

    // Memory errors
    #[error("Unknown memory action: {0}")]
    UnknownAction(String),

    #[error("Memory operation failed: {0}")]
    Memory(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArgusErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            // Configuration errors
            Self::Config(_) => "Check your config.toml file for errors",
            Self::UnknownWorkflow(_) => "Run 'argus workflow list' to see available workflows",
            Self::EmptyWorkflow(_) => "Add at least one agent to the workflow definition",
            Self::MissingAgents(_) => "Register the missing agents before running the workflow",
            Self::InvalidAgent => "Agents must report a non-empty name",
            Self::DuplicateAgent(_) => "Each agent name may only be registered once",

            // Agent execution errors
            Self::MissingDependencies { .. } => {
                "Satisfy the agent's declared dependencies and retry"
            }
            Self::Timeout { .. } => "The agent took too long. Raise its timeout or retry",
            Self::Agent { .. } => "Agent execution failed. Check the logs for details",

            // Memory errors
            Self::UnknownAction(_) => "Use STORE, RETRIEVE, ANALYZE, LEARN or OPTIMIZE",
            Self::Memory(_) => "Memory operation failed. Check the logs for details",

            // Storage errors
            Self::Storage(_) => "Durable store unavailable. State continues in memory only",

            // Generic IO error
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_)
            | Self::UnknownWorkflow(_)
            | Self::EmptyWorkflow(_)
            | Self::MissingAgents(_)
            | Self::InvalidAgent
            | Self::DuplicateAgent(_)
            | Self::UnknownAction(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
