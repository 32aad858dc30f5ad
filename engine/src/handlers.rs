//! Command handlers
//!
//! Wires the CLI commands to the orchestrator and the memory agent:
//! builds the engine from configuration, collects files to review,
//! executes workflows, and renders the results.

use crate::cli::{ConfigAction, MemoryCommand, WorkflowAction};
use crate::config::Config;
use crate::memory::MemoryAgent;
use crate::orchestrator::Orchestrator;
use crate::report::{self, FileReview, OutputFormat};
use crate::review::{GuardianAgent, ValidatorAgent};
use anyhow::{bail, Context, Result};
use sdk::agent::{Agent, AgentContext, MemoryAction, TimePreference};
use sdk::types::AgentConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// File extensions the review commands consider reviewable
const REVIEWABLE_EXTENSIONS: [&str; 8] = ["rs", "js", "jsx", "ts", "tsx", "py", "go", "java"];

/// The assembled engine: orchestrator plus a direct handle on the memory
/// agent for memory subcommands.
pub struct Engine {
    pub orchestrator: Orchestrator,
    pub memory: Arc<MemoryAgent>,
}

/// Build the engine from configuration: register the built-in agents,
/// define the configured workflows, and attach the durable stores.
pub fn build_engine(config: &Config) -> Result<Engine> {
    let agent_config = AgentConfig {
        timeout_ms: config.execution.timeout_ms,
        retry_attempts: config.execution.retry_attempts,
        priority: 5,
        dependencies: Vec::new(),
    };

    let memory = Arc::new(
        MemoryAgent::new(config.learning.clone(), config.memory.clone())
            .with_store(config.memory_path(), config.index_path()),
    );

    let mut orchestrator =
        Orchestrator::new(config.execution.clone()).with_store(config.history_path());
    orchestrator
        .register(Arc::new(ValidatorAgent::new(agent_config.clone())))
        .context("Failed to register validator")?;
    orchestrator
        .register(Arc::new(GuardianAgent::new(agent_config)))
        .context("Failed to register guardian")?;
    orchestrator
        .register(memory.clone())
        .context("Failed to register memory agent")?;

    for def in &config.workflows {
        orchestrator
            .define_workflow(def.clone())
            .with_context(|| format!("Invalid workflow definition '{}'", def.name))?;
    }

    Ok(Engine {
        orchestrator,
        memory,
    })
}

/// Handle `argus review`. Returns the process exit code.
#[allow(clippy::too_many_arguments)]
pub async fn handle_review(
    config: &Config,
    file: Option<PathBuf>,
    staged: bool,
    recent: bool,
    workflow: &str,
    format: &str,
    output: Option<PathBuf>,
    strict: bool,
) -> Result<i32> {
    let format: OutputFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let files = if let Some(file) = file {
        vec![file]
    } else if staged {
        git_changed_files(&["diff", "--cached", "--name-only"]).await?
    } else if recent {
        git_changed_files(&["diff", "--name-only", "HEAD~5"]).await?
    } else {
        bail!("Specify a file, --staged, or --recent");
    };

    if files.is_empty() {
        println!("No reviewable files found");
        return Ok(0);
    }

    let engine = build_engine(config)?;
    let mut reviews = Vec::new();

    for path in files {
        let file_name = path.to_string_lossy().to_string();
        let code = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", file_name))?;

        info!("Reviewing {}", file_name);
        let context = AgentContext::for_file(file_name.as_str(), code, "comprehensive-review");

        let report = engine
            .orchestrator
            .execute_workflow(workflow, context)
            .await
            .with_context(|| format!("Workflow '{}' failed for {}", workflow, file_name))?;

        reviews.push(FileReview {
            file: file_name,
            report,
        });
    }

    engine.orchestrator.shutdown();

    let rendered = report::render(&reviews, format);
    match output {
        Some(path) => {
            tokio::fs::write(&path, &rendered)
                .await
                .with_context(|| format!("Failed to write report to {:?}", path))?;
            println!("Report written to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    let violations = report::total_violations(&reviews);
    if strict && violations > 0 {
        return Ok(1);
    }
    Ok(0)
}

/// Handle `argus workflow ...`.
pub async fn handle_workflow(config: &Config, action: WorkflowAction, json: bool) -> Result<i32> {
    let engine = build_engine(config)?;

    match action {
        WorkflowAction::List => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config.workflows)?);
            } else {
                for def in &config.workflows {
                    let mode = def
                        .mode
                        .map(|m| format!("{:?}", m).to_lowercase())
                        .unwrap_or_else(|| "default".to_string());
                    println!("{:<24} {:<10} agents: {}", def.name, mode, def.agents.join(", "));
                }
            }
        }
        WorkflowAction::Status { id } => match engine.orchestrator.workflow_status(&id) {
            Some(instance) => println!("{}", serde_json::to_string_pretty(&instance)?),
            None => {
                println!("No workflow instance found: {}", id);
                return Ok(1);
            }
        },
        WorkflowAction::History { limit } => {
            let history = engine.orchestrator.workflow_history(limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                for instance in history {
                    println!(
                        "{:<40} {:<10} {:>6}ms  {} agent(s), {} error(s)",
                        instance.id,
                        format!("{:?}", instance.state).to_lowercase(),
                        instance.duration_ms.unwrap_or(0),
                        instance.agents.len(),
                        instance.errors.len()
                    );
                }
            }
        }
    }

    Ok(0)
}

/// Handle `argus agents`.
pub async fn handle_agents(config: &Config, json: bool) -> Result<i32> {
    let engine = build_engine(config)?;
    let performance = engine.orchestrator.performance_snapshot();

    if json {
        let detailed: serde_json::Value = engine
            .orchestrator
            .list_agents()
            .into_iter()
            .map(|name| {
                let info = serde_json::json!({
                    "capabilities": engine.orchestrator.agent_capabilities(&name),
                    "performance": performance.get(&name),
                    "recent_executions": engine
                        .orchestrator
                        .agent_history(&name)
                        .map(|h| h.len())
                        .unwrap_or(0),
                });
                (name, info)
            })
            .collect::<serde_json::Map<String, serde_json::Value>>()
            .into();
        println!("{}", serde_json::to_string_pretty(&detailed)?);
        return Ok(0);
    }

    for name in engine.orchestrator.list_agents() {
        let perf = performance.get(&name).cloned().unwrap_or_default();
        let capabilities = engine
            .orchestrator
            .agent_capabilities(&name)
            .unwrap_or_default();
        println!(
            "{:<12} runs: {:<5} ok: {:<5} failed: {:<5} avg: {:.0}ms  [{}]",
            name,
            perf.executions,
            perf.successes,
            perf.failures,
            perf.average_execution_ms,
            capabilities.join(", ")
        );
    }

    Ok(0)
}

/// Handle `argus memory ...`.
pub async fn handle_memory(config: &Config, action: MemoryCommand) -> Result<i32> {
    let engine = build_engine(config)?;

    let context = match action {
        MemoryCommand::Query { query, prefer } => {
            let mut ctx = AgentContext::for_action(MemoryAction::Retrieve);
            ctx.query = Some(query);
            ctx.time_preference = Some(parse_preference(&prefer)?);
            ctx
        }
        MemoryCommand::Stats => {
            println!("{}", serde_json::to_string_pretty(&engine.memory.statistics())?);
            return Ok(0);
        }
        MemoryCommand::Analyze { kind } => {
            let mut ctx = AgentContext::for_action(MemoryAction::Analyze);
            ctx.analysis_type = Some(kind);
            ctx
        }
        MemoryCommand::Learn => AgentContext::for_action(MemoryAction::Learn),
        MemoryCommand::Optimize => AgentContext::for_action(MemoryAction::Optimize),
    };

    let result = engine
        .memory
        .execute(&context)
        .await
        .context("Memory operation failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(0)
}

/// Handle `argus config ...`.
pub fn handle_config(config: &Config, action: ConfigAction) -> Result<i32> {
    match action {
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Validate => {
            // Loading already validated; confirm and show store locations
            println!("Configuration OK");
            println!("data dir: {}", config.core.data_dir.display());
        }
    }
    Ok(0)
}

fn parse_preference(value: &str) -> Result<TimePreference> {
    match value.to_ascii_lowercase().as_str() {
        "recent" => Ok(TimePreference::Recent),
        "old" => Ok(TimePreference::Old),
        "any" => Ok(TimePreference::Any),
        other => bail!("Unknown time preference '{}'. Use recent, old or any", other),
    }
}

/// Files changed according to git, filtered to reviewable extensions.
async fn git_changed_files(args: &[&str]) -> Result<Vec<PathBuf>> {
    let output = tokio::process::Command::new("git")
        .args(args)
        .output()
        .await
        .context("Failed to run git")?;

    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let files = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            PathBuf::from(line)
                .extension()
                .map(|ext| {
                    REVIEWABLE_EXTENSIONS
                        .contains(&ext.to_string_lossy().to_lowercase().as_str())
                })
                .unwrap_or(false)
        })
        .map(PathBuf::from)
        .collect();

    Ok(files)
}
