//! Argus Engine Library
//!
//! This library provides the core functionality of the Argus code-review
//! engine: the workflow orchestrator, the supervised agent-execution
//! wrapper, the knowledge-management memory agent, and the two built-in
//! reviewer agents. It is used by both the `argus` binary and integration
//! tests.

/// Configuration management module
pub mod config;

/// Durable JSON document store module
pub mod store;

/// Supervised agent execution module
pub mod supervisor;

/// Workflow orchestration module
pub mod orchestrator;

/// Knowledge-management memory agent module
pub mod memory;

/// Built-in reviewer agents
pub mod review;

/// Report rendering module
pub mod report;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
