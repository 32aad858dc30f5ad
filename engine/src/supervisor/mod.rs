//! Supervised agent execution
//!
//! Wraps every registered agent with the execution contract the
//! orchestrator relies on. For each run the supervisor, in order:
//!
//! 1. Validates the agent's declared dependencies; any missing dependency
//!    aborts the attempt before `execute` runs
//! 2. Transitions the agent to RUNNING
//! 3. Races `execute` against a timer; the timer firing first is a timeout
//!    failure for that attempt
//! 4. Retries failed attempts up to the configured limit, with a delay
//!    growing linearly with the attempt number
//! 5. On the terminal outcome, transitions to COMPLETED/FAILED and appends
//!    a record to a bounded execution-history buffer
//!
//! A timeout abandons waiting on the attempt; it does not propagate
//! cancellation into the agent's own asynchronous work.

use sdk::agent::{Agent, AgentContext};
use sdk::errors::EngineError;
use sdk::types::Dependency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Lifecycle state of a supervised agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// One terminal execution appended to the history buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// When the terminal outcome was reached
    pub timestamp: DateTime<Utc>,

    /// Sanitized copy of the context the agent ran against
    pub context: AgentContext,

    /// Result payload on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Final error message on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock duration across all attempts in milliseconds
    pub duration_ms: u64,

    /// Whether the terminal outcome was a success
    pub success: bool,
}

/// A registered agent plus its supervision state.
pub struct SupervisedAgent {
    agent: Arc<dyn Agent>,
    state: Mutex<AgentState>,
    history: Mutex<VecDeque<ExecutionRecord>>,
    history_limit: usize,
    backoff_base: Duration,
}

impl SupervisedAgent {
    /// Wrap an agent for supervised execution.
    pub fn new(agent: Arc<dyn Agent>, history_limit: usize, backoff_base_ms: u64) -> Self {
        Self {
            agent,
            state: Mutex::new(AgentState::Idle),
            history: Mutex::new(VecDeque::new()),
            history_limit,
            backoff_base: Duration::from_millis(backoff_base_ms),
        }
    }

    /// Name of the wrapped agent.
    pub fn name(&self) -> &str {
        self.agent.name()
    }

    /// The wrapped agent.
    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    /// Current supervision state.
    pub fn state(&self) -> AgentState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the bounded execution history, oldest first.
    pub fn history(&self) -> Vec<ExecutionRecord> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Execute the agent with dependency validation, timeout enforcement
    /// and retry-with-backoff.
    ///
    /// `timeout_override` is the per-workflow timeout; when absent the
    /// agent's own configured timeout applies. Zero configured retries
    /// means exactly one attempt.
    pub async fn run(
        &self,
        ctx: &AgentContext,
        timeout_override: Option<u64>,
    ) -> Result<serde_json::Value, EngineError> {
        let start = Instant::now();
        let config = self.agent.config();
        let timeout_ms = timeout_override.unwrap_or(config.timeout_ms);
        let attempts = config.retry_attempts + 1;

        let mut last_error = EngineError::Agent {
            agent: self.name().to_string(),
            message: "never attempted".to_string(),
        };

        for attempt in 1..=attempts {
            match self.attempt(ctx, timeout_ms).await {
                Ok(result) => {
                    self.finish(ctx, Ok(&result), start.elapsed());
                    return Ok(result);
                }
                Err(e) => {
                    if attempt < attempts {
                        warn!(
                            "Agent '{}' failed, retrying ({}/{}): {}",
                            self.name(),
                            attempt,
                            config.retry_attempts,
                            e
                        );
                        tokio::time::sleep(self.backoff_base * attempt).await;
                    }
                    last_error = e;
                }
            }
        }

        self.finish(ctx, Err(&last_error), start.elapsed());
        Err(last_error)
    }

    /// One attempt: dependency validation, then the timeout race.
    async fn attempt(
        &self,
        ctx: &AgentContext,
        timeout_ms: u64,
    ) -> Result<serde_json::Value, EngineError> {
        let missing = missing_dependencies(&self.agent.config().dependencies);
        if !missing.is_empty() {
            return Err(EngineError::MissingDependencies {
                agent: self.name().to_string(),
                missing: missing.join(", "),
            });
        }

        self.set_state(AgentState::Running);
        debug!("Executing agent '{}' (timeout {}ms)", self.name(), timeout_ms);

        match tokio::time::timeout(Duration::from_millis(timeout_ms), self.agent.execute(ctx))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                agent: self.name().to_string(),
                timeout_ms,
            }),
        }
    }

    /// Record the terminal outcome: state transition plus history append.
    fn finish(
        &self,
        ctx: &AgentContext,
        outcome: Result<&serde_json::Value, &EngineError>,
        elapsed: Duration,
    ) {
        let (state, result, error) = match outcome {
            Ok(value) => (AgentState::Completed, Some(value.clone()), None),
            Err(e) => (AgentState::Failed, None, Some(e.to_string())),
        };

        self.set_state(state);

        let record = ExecutionRecord {
            timestamp: Utc::now(),
            context: ctx.sanitized(),
            result,
            error,
            duration_ms: elapsed.as_millis() as u64,
            success: state == AgentState::Completed,
        };

        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.push_back(record);
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }

    fn set_state(&self, state: AgentState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

/// Collect unsatisfied dependencies. A check that fails internally counts
/// as unsatisfied rather than propagating.
fn missing_dependencies(dependencies: &[Dependency]) -> Vec<String> {
    dependencies
        .iter()
        .filter(|dep| !dep.is_satisfied())
        .map(|dep| dep.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sdk::types::AgentConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Test agent that fails a configurable number of times before
    /// succeeding, counting invocations.
    struct FlakyAgent {
        config: AgentConfig,
        calls: AtomicU32,
        fail_first: u32,
        delay_ms: u64,
    }

    impl FlakyAgent {
        fn new(retry_attempts: u32, fail_first: u32) -> Self {
            Self {
                config: AgentConfig {
                    timeout_ms: 1_000,
                    retry_attempts,
                    priority: 5,
                    dependencies: Vec::new(),
                },
                calls: AtomicU32::new(0),
                fail_first,
                delay_ms: 0,
            }
        }
    }

    #[async_trait]
    impl Agent for FlakyAgent {
        fn name(&self) -> &str {
            "flaky"
        }

        fn capabilities(&self) -> Vec<String> {
            vec!["testing".into()]
        }

        fn config(&self) -> &AgentConfig {
            &self.config
        }

        async fn execute(&self, _ctx: &AgentContext) -> Result<serde_json::Value, EngineError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if call <= self.fail_first {
                Err(EngineError::Agent {
                    agent: "flaky".into(),
                    message: format!("attempt {} failed", call),
                })
            } else {
                Ok(serde_json::json!({ "attempt": call }))
            }
        }
    }

    fn supervised(agent: FlakyAgent) -> (Arc<FlakyAgent>, SupervisedAgent) {
        let agent = Arc::new(agent);
        let sup = SupervisedAgent::new(agent.clone(), 100, 1);
        (agent, sup)
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let (agent, sup) = supervised(FlakyAgent::new(2, 0));

        let result = sup.run(&AgentContext::default(), None).await.unwrap();
        assert_eq!(result["attempt"], 1);
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sup.state(), AgentState::Completed);
    }

    #[tokio::test]
    async fn test_retry_then_succeed() {
        let (agent, sup) = supervised(FlakyAgent::new(2, 2));

        let result = sup.run(&AgentContext::default(), None).await.unwrap();
        assert_eq!(result["attempt"], 3);
        assert_eq!(agent.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_at_most_n_plus_one_attempts() {
        let (agent, sup) = supervised(FlakyAgent::new(2, u32::MAX));

        let err = sup.run(&AgentContext::default(), None).await.unwrap_err();
        assert!(matches!(err, EngineError::Agent { .. }));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 3);
        assert_eq!(sup.state(), AgentState::Failed);
    }

    #[tokio::test]
    async fn test_zero_retries_means_one_attempt() {
        let (agent, sup) = supervised(FlakyAgent::new(0, u32::MAX));

        let _ = sup.run(&AgentContext::default(), None).await;
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_failure() {
        let mut flaky = FlakyAgent::new(0, 0);
        flaky.delay_ms = 200;
        flaky.config.timeout_ms = 10;
        let (_, sup) = supervised(flaky);

        let err = sup.run(&AgentContext::default(), None).await.unwrap_err();
        assert!(matches!(err, EngineError::Timeout { timeout_ms: 10, .. }));
    }

    #[tokio::test]
    async fn test_timeout_override_wins() {
        let mut flaky = FlakyAgent::new(0, 0);
        flaky.delay_ms = 50;
        flaky.config.timeout_ms = 1;
        let (_, sup) = supervised(flaky);

        // Generous workflow-level override lets the slow agent finish
        let result = sup.run(&AgentContext::default(), Some(5_000)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_dependency_aborts_before_execute() {
        let mut flaky = FlakyAgent::new(0, 0);
        flaky.config.dependencies = vec![Dependency::File("/definitely/not/here".into())];
        let (agent, sup) = supervised(flaky);

        let err = sup.run(&AgentContext::default(), None).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingDependencies { .. }));
        // execute never ran
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let agent = Arc::new(FlakyAgent::new(0, 0));
        let sup = SupervisedAgent::new(agent, 3, 1);

        for _ in 0..10 {
            let _ = sup.run(&AgentContext::default(), None).await;
        }

        assert_eq!(sup.history().len(), 3);
    }

    #[tokio::test]
    async fn test_history_records_failure() {
        let (_, sup) = supervised(FlakyAgent::new(0, u32::MAX));

        let _ = sup.run(&AgentContext::default(), None).await;
        let history = sup.history();
        assert_eq!(history.len(), 1);
        assert!(!history[0].success);
        assert!(history[0].error.is_some());
    }
}
