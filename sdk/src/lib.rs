//! Argus SDK
//!
//! Shared library providing the agent contract, workflow types, and error
//! handling used by the Argus engine and by out-of-tree agents.

/// Agent trait and execution context
pub mod agent;

/// Error types and handling
pub mod errors;

/// Workflow and outcome types
pub mod types;

// Re-export commonly used types
pub use agent::{Agent, AgentContext, MemoryAction, TimePreference};
pub use errors::{ArgusErrorExt, EngineError};
pub use types::{
    AgentConfig, AgentOutcome, Dependency, ExecutionMode, ReviewVerdict, Severity, Violation,
    WorkflowDefinition, WorkflowState,
};
