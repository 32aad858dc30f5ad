//! Configuration management
//!
//! This module handles loading, validation, and management of the Argus
//! configuration. Configuration is stored in TOML format at
//! ~/.argus/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Data directory, log level
//! - **execution**: Orchestrator defaults (timeout, retries, execution mode,
//!   failure policy, backoff)
//! - **learning**: Memory-agent tuning (pattern recognition, retrieval
//!   ranking, compression/retention)
//! - **memory**: Domain keywords used for semantic tagging
//! - **workflow**: Named workflow definitions
//!
//! Relevance and confidence scores in the memory subsystem are accumulated
//! through additive heuristics with empirically chosen constants; every one
//! of those constants is a field here so it can be tuned without code
//! changes.
//!
//! # Path Expansion
//!
//! The configuration system automatically expands ~ to the user's home
//! directory and creates the data directory if it doesn't exist.

use sdk::errors::EngineError;
use sdk::types::WorkflowDefinition;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Represents the complete Argus configuration loaded from
/// ~/.argus/config.toml. Every section has serde defaults, so a missing or
/// partial file still produces a usable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Orchestrator execution defaults
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Memory-agent learning configuration
    #[serde(default)]
    pub learning: LearningConfig,

    /// Memory tagging settings
    #[serde(default)]
    pub memory: MemorySettings,

    /// Named workflow definitions
    #[serde(default = "default_workflows", rename = "workflow")]
    pub workflows: Vec<WorkflowDefinition>,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Data directory for the durable JSON stores (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Orchestrator execution defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Default per-attempt timeout in milliseconds when neither the agent
    /// nor the workflow overrides it
    #[serde(default = "default_execution_timeout_ms")]
    pub timeout_ms: u64,

    /// Default retry attempts for workflows that don't specify their own
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Global default execution mode; a workflow-level mode overrides this
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Sequential mode: keep executing after a failing agent so the memory
    /// agent can still record the partial failure
    #[serde(default = "default_true")]
    pub continue_on_failure: bool,

    /// Base delay between retries; the actual delay grows linearly with
    /// the attempt number
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Cap on the per-agent execution-history buffer
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_execution_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            parallel: true,
            continue_on_failure: true,
            backoff_base_ms: default_backoff_base_ms(),
            history_limit: default_history_limit(),
        }
    }
}

/// Memory-agent learning configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Pattern recognition thresholds
    #[serde(default)]
    pub patterns: PatternConfig,

    /// Retrieval ranking parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Compression and retention windows
    #[serde(default)]
    pub compression: CompressionConfig,
}

/// Pattern recognition thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Minimum entry occurrences before a pattern may exist at all
    #[serde(default = "default_min_occurrences")]
    pub min_occurrences: usize,

    /// Minimum confidence for a newly recognized pattern
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Hard cap on retained patterns; excess is truncated by
    /// confidence x frequency
    #[serde(default = "default_max_patterns")]
    pub max_patterns: usize,

    /// Confidence nudge applied when a new entry reinforces a known pattern
    #[serde(default = "default_reinforcement")]
    pub reinforcement: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_occurrences: default_min_occurrences(),
            confidence_threshold: default_confidence_threshold(),
            max_patterns: default_max_patterns(),
            reinforcement: default_reinforcement(),
        }
    }
}

/// Retrieval ranking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum results returned by a retrieval
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Results below this relevance are dropped
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,

    /// Exponential recency decay factor (per day of age)
    #[serde(default = "default_time_decay_factor")]
    pub time_decay_factor: f64,

    /// Context-signature similarity must exceed this to qualify at all;
    /// context similarity is a weak but precise signal
    #[serde(default = "default_context_similarity_threshold")]
    pub context_similarity_threshold: f64,

    /// Returned entries above this relevance get a permanent reinforcement
    #[serde(default = "default_reinforce_above")]
    pub reinforce_above: f64,

    /// Multiplicative reinforcement applied to such entries
    #[serde(default = "default_reinforce_factor")]
    pub reinforce_factor: f64,

    /// Per-search-dimension ranking weights
    #[serde(default)]
    pub weights: SearchWeights,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            relevance_threshold: default_relevance_threshold(),
            time_decay_factor: default_time_decay_factor(),
            context_similarity_threshold: default_context_similarity_threshold(),
            reinforce_above: default_reinforce_above(),
            reinforce_factor: default_reinforce_factor(),
            weights: SearchWeights::default(),
        }
    }
}

/// Per-search-dimension ranking weights (semantic > pattern > content >
/// context > temporal)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchWeights {
    #[serde(default = "default_weight_semantic")]
    pub semantic: f64,

    #[serde(default = "default_weight_pattern")]
    pub pattern: f64,

    #[serde(default = "default_weight_content")]
    pub content: f64,

    #[serde(default = "default_weight_context")]
    pub context: f64,

    #[serde(default = "default_weight_temporal")]
    pub temporal: f64,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            semantic: default_weight_semantic(),
            pattern: default_weight_pattern(),
            content: default_weight_content(),
            context: default_weight_context(),
            temporal: default_weight_temporal(),
        }
    }
}

/// Compression and retention windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Master switch for payload compression during maintenance
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum entries kept; beyond this the lowest-value entries are
    /// evicted
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Entries older than this are expired unless important or frequently
    /// accessed
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Entries older than this get their payload replaced with a summary
    #[serde(default = "default_compression_days")]
    pub compression_days: i64,

    /// Run maintenance after every Nth STORE
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval: u64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_capacity(),
            retention_days: default_retention_days(),
            compression_days: default_compression_days(),
            maintenance_interval: default_maintenance_interval(),
        }
    }
}

/// Memory tagging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    /// Domain keywords promoted to semantic tags when found in a payload
    #[serde(default = "default_domain_keywords")]
    pub domain_keywords: Vec<String>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            domain_keywords: default_domain_keywords(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.argus")
}

fn default_execution_timeout_ms() -> u64 {
    300_000
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_history_limit() -> usize {
    100
}

fn default_min_occurrences() -> usize {
    3
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_max_patterns() -> usize {
    1_000
}

fn default_reinforcement() -> f64 {
    0.05
}

fn default_max_results() -> usize {
    10
}

fn default_relevance_threshold() -> f64 {
    0.5
}

fn default_time_decay_factor() -> f64 {
    0.1
}

fn default_context_similarity_threshold() -> f64 {
    0.3
}

fn default_reinforce_above() -> f64 {
    0.7
}

fn default_reinforce_factor() -> f64 {
    1.02
}

fn default_weight_semantic() -> f64 {
    1.2
}

fn default_weight_pattern() -> f64 {
    1.15
}

fn default_weight_content() -> f64 {
    1.1
}

fn default_weight_context() -> f64 {
    1.05
}

fn default_weight_temporal() -> f64 {
    1.0
}

fn default_capacity() -> usize {
    1_000
}

fn default_retention_days() -> i64 {
    90
}

fn default_compression_days() -> i64 {
    7
}

fn default_maintenance_interval() -> u64 {
    10
}

fn default_domain_keywords() -> Vec<String> {
    ["api", "auth", "storage", "ui"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_workflows() -> Vec<WorkflowDefinition> {
    vec![
        WorkflowDefinition::sequential(
            "code-review",
            vec!["validator".into(), "guardian".into(), "memory".into()],
        ),
        WorkflowDefinition::sequential("quality-check", vec!["validator".into(), "memory".into()]),
        WorkflowDefinition::sequential(
            "architecture-review",
            vec!["guardian".into(), "memory".into()],
        ),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            execution: ExecutionConfig::default(),
            learning: LearningConfig::default(),
            memory: MemorySettings::default(),
            workflows: default_workflows(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.argus/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default
    /// configuration. Validates the configuration after loading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails, or
    /// validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save it to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.argus/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".argus").join("config.toml"))
    }

    /// Path of the workflow-history/performance store
    pub fn history_path(&self) -> PathBuf {
        self.core.data_dir.join("history.json")
    }

    /// Path of the memory entry store
    pub fn memory_path(&self) -> PathBuf {
        self.core.data_dir.join("memory.json")
    }

    /// Path of the inverted-index/pattern store
    pub fn index_path(&self) -> PathBuf {
        self.core.data_dir.join("index.json")
    }

    /// Validate and process configuration
    ///
    /// Validates field ranges, expands ~ in the data directory, and creates
    /// the data directory if it doesn't exist.
    pub fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        for (name, value) in [
            (
                "patterns.confidence_threshold",
                self.learning.patterns.confidence_threshold,
            ),
            (
                "retrieval.relevance_threshold",
                self.learning.retrieval.relevance_threshold,
            ),
            (
                "retrieval.context_similarity_threshold",
                self.learning.retrieval.context_similarity_threshold,
            ),
            (
                "retrieval.reinforce_above",
                self.learning.retrieval.reinforce_above,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::Config(format!(
                    "{} must be between 0.0 and 1.0",
                    name
                )));
            }
        }

        if self.learning.patterns.min_occurrences == 0 {
            return Err(EngineError::Config(
                "patterns.min_occurrences must be at least 1".to_string(),
            ));
        }

        if self.learning.compression.maintenance_interval == 0 {
            return Err(EngineError::Config(
                "compression.maintenance_interval must be at least 1".to_string(),
            ));
        }

        for def in &self.workflows {
            if def.name.is_empty() {
                return Err(EngineError::Config(
                    "Workflow definitions must be named".to_string(),
                ));
            }
        }

        // Expand and create the data directory
        self.core.data_dir = expand_path(&self.core.data_dir)?;
        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.execution.timeout_ms, 300_000);
        assert_eq!(config.execution.retry_attempts, 2);
        assert!(config.execution.parallel);
        assert!(config.execution.continue_on_failure);
        assert_eq!(config.learning.patterns.min_occurrences, 3);
        assert_eq!(config.learning.retrieval.max_results, 10);
        assert_eq!(config.learning.compression.retention_days, 90);
        assert_eq!(config.workflows.len(), 3);
    }

    #[test]
    fn test_search_weight_ordering() {
        // Ranking privileges semantic > pattern > content > context > temporal
        let w = SearchWeights::default();
        assert!(w.semantic > w.pattern);
        assert!(w.pattern > w.content);
        assert!(w.content > w.context);
        assert!(w.context > w.temporal);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = Config::default();
        config.core.data_dir = std::env::temp_dir().join("argus-config-test");
        config.core.log_level = "loud".to_string();

        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_threshold_range_rejected() {
        let mut config = Config::default();
        config.core.data_dir = std::env::temp_dir().join("argus-config-test");
        config.learning.retrieval.relevance_threshold = 1.5;

        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(
            config.learning.patterns.min_occurrences,
            deserialized.learning.patterns.min_occurrences
        );
        assert_eq!(config.workflows.len(), deserialized.workflows.len());
    }

    #[test]
    fn test_partial_config_parses() {
        let config: Config = toml::from_str(
            r#"
            [execution]
            retry_attempts = 5
        "#,
        )
        .unwrap();

        assert_eq!(config.execution.retry_attempts, 5);
        assert_eq!(config.execution.timeout_ms, 300_000);
        assert_eq!(config.workflows.len(), 3);
    }
}
