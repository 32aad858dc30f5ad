//! Workflow orchestration
//!
//! The orchestrator holds the registry of agents and named workflow
//! definitions, executes workflow instances in parallel or sequential
//! mode, tracks workflow state, and persists workflow history and
//! per-agent performance statistics to the durable ledger.
//!
//! Individual agent failures are isolated to their own slot in the results
//! map and do not fail the owning workflow; only orchestration-level
//! errors (unknown workflow, unregistered agents) propagate to the caller.

use crate::config::ExecutionConfig;
use crate::store;
use crate::supervisor::{ExecutionRecord, SupervisedAgent};
use chrono::{DateTime, Utc};
use sdk::agent::{Agent, AgentContext};
use sdk::errors::EngineError;
use sdk::types::{AgentOutcome, ExecutionMode, WorkflowDefinition, WorkflowState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{error, info, warn};

/// One agent-level failure recorded on a workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFailure {
    /// Failing agent name
    pub agent: String,

    /// Final error message after retries were exhausted
    pub error: String,
}

/// A single run of a named workflow.
///
/// Created when the run is requested, mutated only by the orchestrator,
/// terminal once completed/failed/cancelled, and retained in the history
/// ledger after removal from the active set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Instance id: workflow name + creation timestamp
    pub id: String,

    /// Workflow name
    pub name: String,

    /// Lifecycle state
    pub state: WorkflowState,

    /// Sanitized copy of the context the workflow ran against
    pub context: AgentContext,

    /// When the run was requested
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    /// Total wall-clock duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Agent names resolved for this run
    pub agents: Vec<String>,

    /// Per-agent outcomes, exactly one entry per resolved agent
    pub results: BTreeMap<String, AgentOutcome>,

    /// Agent-level failures observed during the run
    pub errors: Vec<AgentFailure>,
}

/// Per-agent performance bookkeeping.
///
/// Created at registration, updated exactly once per terminal outcome,
/// never deleted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub executions: u64,
    pub successes: u64,
    pub failures: u64,

    /// Running average over successful executions, in milliseconds
    pub average_execution_ms: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<DateTime<Utc>>,
}

impl PerformanceRecord {
    fn record_success(&mut self, duration_ms: u64) {
        self.executions += 1;
        self.successes += 1;
        self.average_execution_ms = (self.average_execution_ms * (self.successes - 1) as f64
            + duration_ms as f64)
            / self.successes as f64;
        self.last_execution = Some(Utc::now());
    }

    fn record_failure(&mut self) {
        self.executions += 1;
        self.failures += 1;
        self.last_execution = Some(Utc::now());
    }
}

/// The durable workflow-history/performance document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionLedger {
    /// Terminal workflow instances keyed by instance id
    pub workflows: BTreeMap<String, WorkflowInstance>,

    /// Per-agent performance records keyed by agent name
    pub performance: BTreeMap<String, PerformanceRecord>,

    /// When the ledger was last written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<DateTime<Utc>>,
}

/// The value returned to the caller of [`Orchestrator::execute_workflow`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    /// Whether orchestration itself succeeded (agent failures inside
    /// `results` do not clear this flag)
    pub success: bool,

    /// The workflow instance id
    pub workflow_id: String,

    /// Per-agent outcomes
    pub results: BTreeMap<String, AgentOutcome>,

    /// Total wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Observer interface for workflow progress.
///
/// Passed into `execute_workflow_with_listener`; all methods have no-op
/// defaults so implementors subscribe only to what they need.
pub trait WorkflowListener: Send + Sync {
    /// Called on every workflow state transition.
    fn on_state_change(&self, _workflow_id: &str, _state: WorkflowState) {}

    /// Called after each agent reaches its terminal outcome.
    fn on_agent_finished(&self, _workflow_id: &str, _agent: &str, _outcome: &AgentOutcome) {}
}

/// Central coordinator for the agent team.
pub struct Orchestrator {
    execution: ExecutionConfig,
    agents: HashMap<String, Arc<SupervisedAgent>>,
    workflows: HashMap<String, WorkflowDefinition>,
    active: Mutex<HashMap<String, WorkflowInstance>>,
    ledger: Mutex<ExecutionLedger>,
    ledger_path: Option<PathBuf>,
}

impl Orchestrator {
    /// Create an orchestrator with no durable ledger (state lives only in
    /// memory; useful for tests).
    pub fn new(execution: ExecutionConfig) -> Self {
        Self {
            execution,
            agents: HashMap::new(),
            workflows: HashMap::new(),
            active: Mutex::new(HashMap::new()),
            ledger: Mutex::new(ExecutionLedger::default()),
            ledger_path: None,
        }
    }

    /// Attach a durable ledger, loading any existing document.
    pub fn with_store(mut self, path: PathBuf) -> Self {
        let ledger: ExecutionLedger = store::load_or_default(&path);
        self.ledger = Mutex::new(ledger);
        self.ledger_path = Some(path);
        self
    }

    /// Register an agent.
    ///
    /// Rejects agents with an empty name and duplicate registrations.
    /// Initializes the agent's performance record if it has none yet.
    pub fn register(&mut self, agent: Arc<dyn Agent>) -> Result<(), EngineError> {
        let name = agent.name().to_string();
        if name.is_empty() {
            return Err(EngineError::InvalidAgent);
        }
        if self.agents.contains_key(&name) {
            return Err(EngineError::DuplicateAgent(name));
        }

        info!("Agent registered: {}", name);

        let supervised = SupervisedAgent::new(
            agent,
            self.execution.history_limit,
            self.execution.backoff_base_ms,
        );
        self.agents.insert(name.clone(), Arc::new(supervised));

        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .performance
            .entry(name)
            .or_default();

        Ok(())
    }

    /// Define (or replace) a named workflow.
    pub fn define_workflow(&mut self, def: WorkflowDefinition) -> Result<(), EngineError> {
        if def.name.is_empty() {
            return Err(EngineError::Config("Workflow name is required".into()));
        }
        self.workflows.insert(def.name.clone(), def);
        Ok(())
    }

    /// Names of all registered agents.
    pub fn list_agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of all defined workflows.
    pub fn list_workflows(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workflows.keys().cloned().collect();
        names.sort();
        names
    }

    /// Performance record for one agent.
    pub fn agent_performance(&self, name: &str) -> Option<PerformanceRecord> {
        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .performance
            .get(name)
            .cloned()
    }

    /// Snapshot of all performance records.
    pub fn performance_snapshot(&self) -> BTreeMap<String, PerformanceRecord> {
        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .performance
            .clone()
    }

    /// Capability tags of a registered agent.
    pub fn agent_capabilities(&self, name: &str) -> Option<Vec<String>> {
        self.agents.get(name).map(|sup| sup.agent().capabilities())
    }

    /// Bounded execution history for one agent.
    pub fn agent_history(&self, name: &str) -> Option<Vec<ExecutionRecord>> {
        self.agents.get(name).map(|sup| sup.history())
    }

    /// Look up a workflow instance: the active set first, then history.
    pub fn workflow_status(&self, workflow_id: &str) -> Option<WorkflowInstance> {
        if let Some(instance) = self
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(workflow_id)
        {
            return Some(instance.clone());
        }

        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .workflows
            .get(workflow_id)
            .cloned()
    }

    /// Most recent terminal workflow instances, newest first.
    pub fn workflow_history(&self, limit: usize) -> Vec<WorkflowInstance> {
        let ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        let mut instances: Vec<WorkflowInstance> = ledger.workflows.values().cloned().collect();
        instances.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        instances.truncate(limit);
        instances
    }

    /// Execute a named workflow against the given context.
    pub async fn execute_workflow(
        &self,
        name: &str,
        context: AgentContext,
    ) -> Result<WorkflowReport, EngineError> {
        self.execute_workflow_with_listener(name, context, None)
            .await
    }

    /// Execute a named workflow, reporting progress to a listener.
    ///
    /// Fails fast (never reaching RUNNING) on configuration errors:
    /// unknown workflow, empty agent list, unregistered agents. Every
    /// terminal instance is appended to the history ledger and removed
    /// from the active set regardless of outcome.
    pub async fn execute_workflow_with_listener(
        &self,
        name: &str,
        context: AgentContext,
        listener: Option<&dyn WorkflowListener>,
    ) -> Result<WorkflowReport, EngineError> {
        let started = Instant::now();
        let workflow_id = format!("{}-{}", name, Utc::now().timestamp_millis());
        info!("Starting workflow: {} ({})", name, workflow_id);

        let mut run_context = context.clone();
        run_context.workflow_id = Some(workflow_id.clone());
        if run_context.timestamp.is_none() {
            run_context.timestamp = Some(Utc::now());
        }

        let mut instance = WorkflowInstance {
            id: workflow_id.clone(),
            name: name.to_string(),
            state: WorkflowState::Pending,
            context: context.sanitized(),
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            agents: Vec::new(),
            results: BTreeMap::new(),
            errors: Vec::new(),
        };

        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(workflow_id.clone(), instance.clone());
        if let Some(l) = listener {
            l.on_state_change(&workflow_id, WorkflowState::Pending);
        }

        let run = self
            .run_instance(name, &run_context, &workflow_id, &mut instance, listener)
            .await;

        // "finally" semantics: the terminal instance always lands in the
        // history ledger and always leaves the active set
        let duration_ms = started.elapsed().as_millis() as u64;
        instance.ended_at = Some(Utc::now());
        instance.duration_ms = Some(duration_ms);
        instance.state = if run.is_ok() {
            WorkflowState::Completed
        } else {
            WorkflowState::Failed
        };
        if let Some(l) = listener {
            l.on_state_change(&workflow_id, instance.state);
        }

        self.retire_instance(instance.clone());

        match run {
            Ok(results) => {
                info!("Workflow completed: {} ({}ms)", name, duration_ms);
                Ok(WorkflowReport {
                    success: true,
                    workflow_id,
                    results,
                    duration_ms,
                })
            }
            Err(e) => {
                error!("Workflow failed: {} ({})", name, e);
                Err(e)
            }
        }
    }

    /// Resolve the definition and execute its agents.
    async fn run_instance(
        &self,
        name: &str,
        context: &AgentContext,
        workflow_id: &str,
        instance: &mut WorkflowInstance,
        listener: Option<&dyn WorkflowListener>,
    ) -> Result<BTreeMap<String, AgentOutcome>, EngineError> {
        let def = self
            .workflows
            .get(name)
            .ok_or_else(|| EngineError::UnknownWorkflow(name.to_string()))?;

        if def.agents.is_empty() {
            return Err(EngineError::EmptyWorkflow(name.to_string()));
        }

        let missing: Vec<String> = def
            .agents
            .iter()
            .filter(|a| !self.agents.contains_key(*a))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::MissingAgents(missing.join(", ")));
        }

        instance.state = WorkflowState::Running;
        instance.agents = def.agents.clone();
        self.touch_active(instance);
        if let Some(l) = listener {
            l.on_state_change(workflow_id, WorkflowState::Running);
        }

        // Workflow-level mode overrides the orchestrator's global default
        let mode = def.mode.unwrap_or(if self.execution.parallel {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        });

        let results = match mode {
            ExecutionMode::Parallel => {
                self.run_parallel(def, context, workflow_id, listener).await
            }
            ExecutionMode::Sequential => {
                self.run_sequential(def, context, workflow_id, listener)
                    .await
            }
        };

        for (agent, outcome) in &results {
            if !outcome.success {
                instance.errors.push(AgentFailure {
                    agent: agent.clone(),
                    error: outcome
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                });
            }
        }
        if !instance.errors.is_empty() {
            warn!(
                "{} agent(s) failed during workflow {}",
                instance.errors.len(),
                workflow_id
            );
        }
        instance.results = results.clone();
        self.touch_active(instance);

        Ok(results)
    }

    /// Parallel mode: every agent in flight concurrently, each settling
    /// independently so one failure never cancels siblings.
    async fn run_parallel(
        &self,
        def: &WorkflowDefinition,
        context: &AgentContext,
        workflow_id: &str,
        listener: Option<&dyn WorkflowListener>,
    ) -> BTreeMap<String, AgentOutcome> {
        let runs = def.agents.iter().map(|name| {
            let sup = Arc::clone(&self.agents[name]);
            async move {
                let outcome = self.run_agent(&sup, context, def.timeout_ms).await;
                (name.clone(), outcome)
            }
        });

        let settled = futures::future::join_all(runs).await;

        let mut results = BTreeMap::new();
        for (name, outcome) in settled {
            if let Some(l) = listener {
                l.on_agent_finished(workflow_id, &name, &outcome);
            }
            results.insert(name, outcome);
        }
        results
    }

    /// Sequential mode: agents run one at a time in list order, each
    /// later agent able to observe the accumulated results. Execution
    /// continues past failures by default so the memory agent can still
    /// record a workflow's partial failure.
    async fn run_sequential(
        &self,
        def: &WorkflowDefinition,
        context: &AgentContext,
        workflow_id: &str,
        listener: Option<&dyn WorkflowListener>,
    ) -> BTreeMap<String, AgentOutcome> {
        let continue_on_failure = def
            .continue_on_failure
            .unwrap_or(self.execution.continue_on_failure);

        let mut results: BTreeMap<String, AgentOutcome> = BTreeMap::new();

        for name in &def.agents {
            let sup = &self.agents[name];

            let agent_context = if sup.agent().wants_workflow_results() {
                context.clone().with_workflow_results(results.clone())
            } else {
                context.clone()
            };

            let outcome = self.run_agent(sup, &agent_context, def.timeout_ms).await;
            if let Some(l) = listener {
                l.on_agent_finished(workflow_id, name, &outcome);
            }

            let failed = !outcome.success;
            results.insert(name.clone(), outcome);

            if failed && !continue_on_failure {
                break;
            }
        }

        results
    }

    /// Run one agent through its supervisor and record the outcome in the
    /// performance ledger (exactly once per terminal outcome).
    async fn run_agent(
        &self,
        sup: &SupervisedAgent,
        context: &AgentContext,
        timeout_override: Option<u64>,
    ) -> AgentOutcome {
        let start = Instant::now();
        let name = sup.name().to_string();

        match sup.run(context, timeout_override).await {
            Ok(value) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                info!("Agent completed: {} ({}ms)", name, duration_ms);

                let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
                ledger
                    .performance
                    .entry(name)
                    .or_default()
                    .record_success(duration_ms);

                AgentOutcome::success(value, duration_ms)
            }
            Err(e) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                error!("Agent failed: {} ({}ms): {}", name, duration_ms, e);

                let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
                ledger.performance.entry(name).or_default().record_failure();

                AgentOutcome::failure(e.to_string(), duration_ms)
            }
        }
    }

    /// Mark all still-active workflows cancelled and persist the ledger.
    ///
    /// Cancellation does not abort in-flight agent calls; it only stops
    /// them being waited on and marks the record.
    pub fn shutdown(&self) {
        info!("Shutting down orchestrator");

        let drained: Vec<WorkflowInstance> = {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            active.drain().map(|(_, v)| v).collect()
        };

        {
            let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
            for mut instance in drained {
                warn!("Cancelled workflow: {}", instance.id);
                instance.state = WorkflowState::Cancelled;
                instance.ended_at = Some(Utc::now());
                ledger.workflows.insert(instance.id.clone(), instance);
            }
            ledger.last_execution = Some(Utc::now());
        }

        self.persist();
    }

    /// Move a terminal instance from the active set into the ledger.
    fn retire_instance(&self, instance: WorkflowInstance) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&instance.id);

        {
            let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
            ledger.workflows.insert(instance.id.clone(), instance);
            ledger.last_execution = Some(Utc::now());
        }

        self.persist();
    }

    /// Refresh the active-set copy of a running instance.
    fn touch_active(&self, instance: &WorkflowInstance) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(instance.id.clone(), instance.clone());
    }

    fn persist(&self) {
        if let Some(path) = &self.ledger_path {
            let ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
            store::save_best_effort(path, &*ledger);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sdk::types::AgentConfig;
    use std::time::Duration;

    /// Minimal scripted agent for orchestrator tests.
    struct ScriptedAgent {
        name: String,
        config: AgentConfig,
        fail: bool,
        delay_ms: u64,
    }

    impl ScriptedAgent {
        fn ok(name: &str) -> Self {
            Self {
                name: name.to_string(),
                config: AgentConfig {
                    timeout_ms: 1_000,
                    retry_attempts: 0,
                    priority: 5,
                    dependencies: Vec::new(),
                },
                fail: false,
                delay_ms: 0,
            }
        }

        fn failing(name: &str) -> Self {
            let mut agent = Self::ok(name);
            agent.fail = true;
            agent
        }
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn name(&self) -> &str {
            &self.name
        }

        fn capabilities(&self) -> Vec<String> {
            vec!["testing".into()]
        }

        fn config(&self) -> &AgentConfig {
            &self.config
        }

        async fn execute(&self, _ctx: &AgentContext) -> Result<serde_json::Value, EngineError> {
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.fail {
                Err(EngineError::Agent {
                    agent: self.name.clone(),
                    message: "scripted failure".into(),
                })
            } else {
                Ok(serde_json::json!({ "agent": self.name }))
            }
        }
    }

    fn orchestrator_with(agents: Vec<ScriptedAgent>) -> Orchestrator {
        let mut orch = Orchestrator::new(ExecutionConfig {
            backoff_base_ms: 1,
            ..ExecutionConfig::default()
        });
        for agent in agents {
            orch.register(Arc::new(agent)).unwrap();
        }
        orch
    }

    #[tokio::test]
    async fn test_unknown_workflow_fails_fast() {
        let orch = orchestrator_with(vec![]);
        let err = orch
            .execute_workflow("nope", AgentContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownWorkflow(_)));
    }

    #[tokio::test]
    async fn test_missing_agent_fails_fast() {
        let mut orch = orchestrator_with(vec![ScriptedAgent::ok("a")]);
        orch.define_workflow(WorkflowDefinition::sequential(
            "w",
            vec!["a".into(), "ghost".into()],
        ))
        .unwrap();

        let err = orch
            .execute_workflow("w", AgentContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingAgents(_)));

        // The failed instance still lands in history
        assert_eq!(orch.workflow_history(10).len(), 1);
        assert_eq!(orch.workflow_history(10)[0].state, WorkflowState::Failed);
    }

    #[tokio::test]
    async fn test_results_contain_every_agent() {
        let mut orch =
            orchestrator_with(vec![ScriptedAgent::ok("a"), ScriptedAgent::failing("b")]);
        orch.define_workflow(WorkflowDefinition::parallel(
            "w",
            vec!["a".into(), "b".into()],
        ))
        .unwrap();

        let report = orch
            .execute_workflow("w", AgentContext::default())
            .await
            .unwrap();
        assert_eq!(report.results.len(), 2);
        assert!(report.results["a"].success);
        assert!(!report.results["b"].success);
    }

    #[tokio::test]
    async fn test_parallel_failure_does_not_cancel_siblings() {
        let mut slow = ScriptedAgent::ok("slow");
        slow.delay_ms = 50;
        let mut orch = orchestrator_with(vec![slow, ScriptedAgent::failing("fast-fail")]);
        orch.define_workflow(WorkflowDefinition::parallel(
            "w",
            vec!["slow".into(), "fast-fail".into()],
        ))
        .unwrap();

        let report = orch
            .execute_workflow("w", AgentContext::default())
            .await
            .unwrap();
        assert!(report.results["slow"].success);
        assert!(report.results["fast-fail"].error.is_some());
    }

    #[tokio::test]
    async fn test_sequential_continues_past_failure_by_default() {
        let mut orch =
            orchestrator_with(vec![ScriptedAgent::failing("b"), ScriptedAgent::ok("a")]);
        orch.define_workflow(WorkflowDefinition::sequential(
            "w",
            vec!["b".into(), "a".into()],
        ))
        .unwrap();

        let report = orch
            .execute_workflow("w", AgentContext::default())
            .await
            .unwrap();
        assert!(report.success);
        assert_eq!(report.results.len(), 2);
        assert!(report.results["a"].success);
    }

    #[tokio::test]
    async fn test_sequential_stops_when_continue_disabled() {
        let mut orch =
            orchestrator_with(vec![ScriptedAgent::failing("b"), ScriptedAgent::ok("a")]);
        let mut def = WorkflowDefinition::sequential("w", vec!["b".into(), "a".into()]);
        def.continue_on_failure = Some(false);
        orch.define_workflow(def).unwrap();

        let report = orch
            .execute_workflow("w", AgentContext::default())
            .await
            .unwrap();
        assert_eq!(report.results.len(), 1);
        assert!(!report.results.contains_key("a"));
    }

    #[tokio::test]
    async fn test_performance_counts_once_per_terminal_outcome() {
        let mut failing = ScriptedAgent::failing("b");
        failing.config.retry_attempts = 2;
        let mut orch = orchestrator_with(vec![failing]);
        orch.define_workflow(WorkflowDefinition::sequential("w", vec!["b".into()]))
            .unwrap();

        let _ = orch.execute_workflow("w", AgentContext::default()).await;

        let perf = orch.agent_performance("b").unwrap();
        // Three attempts, one terminal outcome
        assert_eq!(perf.executions, 1);
        assert_eq!(perf.failures, 1);
    }

    #[tokio::test]
    async fn test_workflow_status_found_in_history() {
        let mut orch = orchestrator_with(vec![ScriptedAgent::ok("a")]);
        orch.define_workflow(WorkflowDefinition::sequential("w", vec!["a".into()]))
            .unwrap();

        let report = orch
            .execute_workflow("w", AgentContext::default())
            .await
            .unwrap();

        let status = orch.workflow_status(&report.workflow_id).unwrap();
        assert_eq!(status.state, WorkflowState::Completed);
        assert!(status.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let mut orch = orchestrator_with(vec![ScriptedAgent::ok("a")]);
        let err = orch.register(Arc::new(ScriptedAgent::ok("a"))).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateAgent(_)));
    }
}
