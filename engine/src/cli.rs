//! CLI interface for Argus
//!
//! This module provides the command-line interface using clap's derive
//! API. It defines all commands and global flags for running review
//! workflows and interrogating the memory subsystem.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Argus Code Review Engine
///
/// A self-hosted multi-agent code reviewer: named reviewer agents run
/// through configurable workflows, and a memory agent learns from every
/// execution to improve future reviews.
#[derive(Parser, Debug)]
#[command(name = "argus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Review a file, the staged changes, or recently changed files
    Review {
        /// File to review
        file: Option<PathBuf>,

        /// Review files staged in git instead
        #[arg(long, conflicts_with = "file")]
        staged: bool,

        /// Review recently changed files instead
        #[arg(long, conflicts_with_all = ["file", "staged"])]
        recent: bool,

        /// Workflow to run
        #[arg(short, long, default_value = "code-review")]
        workflow: String,

        /// Output format (console, json, markdown)
        #[arg(short, long, default_value = "console")]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Exit non-zero when any violation is found
        #[arg(long)]
        strict: bool,
    },

    /// Inspect workflows
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Show registered agents and their performance records
    Agents,

    /// Operate on the memory subsystem
    Memory {
        #[command(subcommand)]
        action: MemoryCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Workflow inspection actions
#[derive(Subcommand, Debug)]
pub enum WorkflowAction {
    /// List defined workflows
    List,

    /// Show one workflow instance by id
    Status {
        /// Workflow instance id
        id: String,
    },

    /// Show recent workflow history
    History {
        /// Number of instances to show (default: 10)
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

/// Memory subsystem operations
#[derive(Subcommand, Debug)]
pub enum MemoryCommand {
    /// Query stored knowledge
    Query {
        /// Search terms
        query: String,

        /// Temporal preference (recent, old, any)
        #[arg(long, default_value = "recent")]
        prefer: String,
    },

    /// Show memory statistics
    Stats,

    /// Run an analysis pass (patterns, performance, quality, trends,
    /// comprehensive)
    Analyze {
        /// Analysis kind
        #[arg(default_value = "comprehensive")]
        kind: String,
    },

    /// Run the continuous-learning pass
    Learn,

    /// Run memory maintenance
    Optimize,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_file() {
        let cli = Cli::parse_from(["argus", "review", "src/lib.rs"]);
        if let Command::Review { file, strict, workflow, .. } = cli.command {
            assert_eq!(file, Some(PathBuf::from("src/lib.rs")));
            assert!(!strict);
            assert_eq!(workflow, "code-review");
        } else {
            panic!("Expected Review command");
        }
    }

    #[test]
    fn test_review_staged_strict() {
        let cli = Cli::parse_from(["argus", "review", "--staged", "--strict"]);
        if let Command::Review { staged, strict, file, .. } = cli.command {
            assert!(staged);
            assert!(strict);
            assert!(file.is_none());
        } else {
            panic!("Expected Review command");
        }
    }

    #[test]
    fn test_review_format_and_output() {
        let cli = Cli::parse_from([
            "argus", "review", "a.rs", "--format", "markdown", "--output", "report.md",
        ]);
        if let Command::Review { format, output, .. } = cli.command {
            assert_eq!(format, "markdown");
            assert_eq!(output, Some(PathBuf::from("report.md")));
        } else {
            panic!("Expected Review command");
        }
    }

    #[test]
    fn test_workflow_status() {
        let cli = Cli::parse_from(["argus", "workflow", "status", "code-review-123"]);
        if let Command::Workflow { action } = cli.command {
            if let WorkflowAction::Status { id } = action {
                assert_eq!(id, "code-review-123");
            } else {
                panic!("Expected WorkflowAction::Status");
            }
        } else {
            panic!("Expected Workflow command");
        }
    }

    #[test]
    fn test_memory_query() {
        let cli = Cli::parse_from(["argus", "memory", "query", "auth errors", "--prefer", "old"]);
        if let Command::Memory { action } = cli.command {
            if let MemoryCommand::Query { query, prefer } = action {
                assert_eq!(query, "auth errors");
                assert_eq!(prefer, "old");
            } else {
                panic!("Expected MemoryCommand::Query");
            }
        } else {
            panic!("Expected Memory command");
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["argus", "--json", "--log", "debug", "agents"]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
        assert!(matches!(cli.command, Command::Agents));
    }
}
