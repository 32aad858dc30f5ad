//! Property-based tests for SDK types

use proptest::prelude::*;
use sdk::types::{AgentConfig, AgentOutcome, Dependency, WorkflowDefinition};

proptest! {
    /// AgentConfig survives a serde round-trip for any field combination.
    #[test]
    fn agent_config_roundtrip(
        timeout_ms in 1u64..3_600_000,
        retry_attempts in 0u32..10,
        priority in 1u8..=10,
    ) {
        let config = AgentConfig {
            timeout_ms,
            retry_attempts,
            priority,
            dependencies: vec![Dependency::Env("ARGUS_TEST".into())],
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: AgentConfig = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.timeout_ms, timeout_ms);
        prop_assert_eq!(back.retry_attempts, retry_attempts);
        prop_assert_eq!(back.priority, priority);
    }

    /// Workflow definitions keep their agent ordering through serde.
    #[test]
    fn workflow_definition_preserves_agent_order(
        agents in prop::collection::vec("[a-z]{1,12}", 1..8),
    ) {
        let def = WorkflowDefinition::sequential("test", agents.clone());
        let json = serde_json::to_string(&def).unwrap();
        let back: WorkflowDefinition = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.agents, agents);
    }

    /// Outcomes never carry both data and error.
    #[test]
    fn outcome_is_exclusive(duration in 0u64..100_000, succeed in any::<bool>()) {
        let outcome = if succeed {
            AgentOutcome::success(serde_json::json!({"n": duration}), duration)
        } else {
            AgentOutcome::failure("boom", duration)
        };
        prop_assert!(outcome.data.is_some() != outcome.error.is_some());
    }
}
