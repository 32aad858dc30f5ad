//! Knowledge-management memory agent
//!
//! A concrete agent that is simultaneously a knowledge store: it ingests
//! arbitrary execution results, builds keyword/tag/pattern indices over
//! them, answers multi-dimensional relevance queries, recognizes
//! statistical patterns, and performs periodic maintenance.
//!
//! The agent is decomposed into focused submodules - entry construction,
//! per-dimension scoring, pattern recognition, maintenance, analysis -
//! composed here rather than inlined, so each piece stays independently
//! testable. All state is owned by the instance and passed by reference
//! into the routines; multiple memory instances never share anything.

pub mod analysis;
pub mod entry;
pub mod maintenance;
pub mod patterns;
pub mod search;

use crate::config::{LearningConfig, MemorySettings};
use crate::memory::entry::{ContextSignature, MemoryEntry};
use crate::memory::maintenance::{InvertedIndices, MaintenanceReport};
use crate::memory::patterns::Pattern;
use crate::memory::search::Recency;
use crate::store;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sdk::agent::{Agent, AgentContext, MemoryAction, TimePreference};
use sdk::errors::EngineError;
use sdk::types::AgentConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Aggregated learning metrics maintained across stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningMetrics {
    pub total_entries: u64,
    pub success_rate: f64,
    pub average_quality: f64,
    pub last_pattern_count: usize,
}

/// Metadata block of the memory document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,

    pub total_entries: usize,

    #[serde(default)]
    pub learning: LearningMetrics,
}

/// The durable memory document: the entry set plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    pub entries: Vec<MemoryEntry>,

    #[serde(default)]
    pub metadata: MemoryMetadata,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            created: Some(Utc::now()),
            entries: Vec::new(),
            metadata: MemoryMetadata::default(),
        }
    }
}

/// The durable inverted-index/pattern document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDocument {
    #[serde(flatten)]
    pub indices: InvertedIndices,

    /// Recognized patterns
    #[serde(default)]
    pub recognized: Vec<Pattern>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

/// Mutable state owned by one memory agent instance.
struct MemoryState {
    memory: MemoryDocument,
    index: IndexDocument,
    store_count: u64,
}

/// The memory agent.
pub struct MemoryAgent {
    config: AgentConfig,
    learning: LearningConfig,
    domain_keywords: Vec<String>,
    memory_path: Option<PathBuf>,
    index_path: Option<PathBuf>,
    state: Mutex<MemoryState>,
}

impl MemoryAgent {
    /// Registry name of the memory agent.
    pub const NAME: &'static str = "memory";

    /// Create an in-memory agent (no durable store); used by tests and
    /// callers that attach a store afterwards.
    pub fn new(learning: LearningConfig, settings: MemorySettings) -> Self {
        Self {
            config: AgentConfig {
                timeout_ms: 60_000,
                retry_attempts: 3,
                priority: 1,
                dependencies: Vec::new(),
            },
            learning,
            domain_keywords: settings.domain_keywords,
            memory_path: None,
            index_path: None,
            state: Mutex::new(MemoryState {
                memory: MemoryDocument::default(),
                index: IndexDocument::default(),
                store_count: 0,
            }),
        }
    }

    /// Attach the durable memory and index documents, loading any
    /// existing state.
    pub fn with_store(mut self, memory_path: PathBuf, index_path: PathBuf) -> Self {
        let memory: MemoryDocument = store::load_or_default(&memory_path);
        let index: IndexDocument = store::load_or_default(&index_path);
        info!(
            "Memory loaded: {} entries, {} patterns",
            memory.entries.len(),
            index.recognized.len()
        );

        self.state = Mutex::new(MemoryState {
            memory,
            index,
            store_count: 0,
        });
        self.memory_path = Some(memory_path);
        self.index_path = Some(index_path);
        self
    }

    /// Number of stored entries.
    pub fn entry_count(&self) -> usize {
        self.lock_state().memory.entries.len()
    }

    /// Statistics summary for reports and the CLI.
    pub fn statistics(&self) -> Value {
        let state = self.lock_state();
        Self::statistics_of(&state)
    }

    fn statistics_of(state: &MemoryState) -> Value {
        let compressed = state
            .memory
            .entries
            .iter()
            .filter(|e| e.compressed)
            .count();

        json!({
            "total_entries": state.memory.entries.len(),
            "index_size": state.index.indices.terms.len(),
            "patterns_count": state.index.recognized.len(),
            "compressed_entries": compressed,
            "last_update": state.memory.metadata.last_update,
        })
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// STORE: ingest a payload (or a sequential run's accumulated
    /// workflow results), reinforce matching known patterns, and keep the
    /// entry set within capacity.
    fn handle_store(&self, state: &mut MemoryState, ctx: &AgentContext) -> Value {
        let payload = ctx
            .workflow_results
            .as_ref()
            .map(|results| serde_json::to_value(results).unwrap_or(Value::Null))
            .or_else(|| ctx.data_to_store.clone());

        let Some(data) = payload else {
            warn!("No data to store in memory");
            return json!({ "stored": false, "message": "No data provided to store" });
        };

        let entry = entry::build_entry(&data, ctx, &self.domain_keywords);

        let reinforced =
            patterns::reinforce(&mut state.index.recognized, &entry, &self.learning.patterns);
        if reinforced > 0 {
            debug!("Entry reinforced {} known pattern(s)", reinforced);
        }

        self.update_learning_metrics(state, &entry);

        let mut result = json!({
            "stored": true,
            "entry_id": entry.id.clone(),
            "patterns": entry.extracted_patterns.clone(),
            "relevance_score": entry.relevance_score,
        });

        state.memory.entries.push(entry);
        let evicted = maintenance::evict_capacity(
            &mut state.memory.entries,
            self.learning.compression.capacity,
        );
        if evicted > 0 {
            debug!("Capacity eviction removed {} entries", evicted);
        }

        state.store_count += 1;

        result["entries_count"] = json!(state.memory.entries.len());
        result
    }

    /// RETRIEVE: run the five scoring passes, merge, rank, and learn from
    /// what was retrieved.
    fn handle_retrieve(&self, state: &mut MemoryState, ctx: &AgentContext) -> Value {
        if state.memory.entries.is_empty() {
            return json!({
                "found": false,
                "message": "No data in memory",
                "suggestions": retrieval_suggestions(),
            });
        }

        let retrieval = &self.learning.retrieval;
        let query = ctx.query.clone().unwrap_or_default();
        let query_value = Value::String(query.clone());

        let terms = search::extract_search_terms(&query);
        let query_tags = entry::semantic_tags(&query_value, ctx, &self.domain_keywords);
        let query_patterns = entry::extract_pattern_candidates(&query_value, ctx);
        let query_signature = ContextSignature::from_context(ctx, &self.domain_keywords);
        let recency = match ctx.time_preference.unwrap_or_default() {
            TimePreference::Recent => Recency::Recent,
            TimePreference::Old => Recency::Old,
            TimePreference::Any => Recency::Any,
        };

        let now = Utc::now();
        let entries = &state.memory.entries;

        let mut hits = Vec::new();
        hits.extend(search::search_by_content(entries, &terms));
        hits.extend(search::search_by_semantic(entries, &query_tags));
        hits.extend(search::search_by_patterns(entries, &query_patterns));
        hits.extend(search::search_by_context(
            entries,
            &query_signature,
            retrieval.context_similarity_threshold,
        ));
        hits.extend(search::search_by_temporal(
            entries,
            recency,
            retrieval.time_decay_factor,
            now,
        ));

        let unique = search::deduplicate(hits);
        let total_searched = unique.len();
        let ranked = search::rank(unique, entries, retrieval);

        // Access bookkeeping plus learning-from-retrieval: strong matches
        // get a small permanent relevance reinforcement
        for hit in &ranked {
            if let Some(entry) = state
                .memory
                .entries
                .iter_mut()
                .find(|e| e.id == hit.id)
            {
                entry.access_count += 1;
                entry.last_accessed = now;
                if hit.relevance > retrieval.reinforce_above {
                    entry.relevance_score =
                        (entry.relevance_score * retrieval.reinforce_factor).min(1.0);
                }
            }
        }

        let average_relevance = if ranked.is_empty() {
            0.0
        } else {
            ranked.iter().map(|h| h.relevance).sum::<f64>() / ranked.len() as f64
        };

        let results: Vec<Value> = ranked
            .iter()
            .filter_map(|hit| {
                state.memory.entries.iter().find(|e| e.id == hit.id).map(|e| {
                    json!({
                        "id": e.id,
                        "relevance": hit.relevance,
                        "search_type": hit.search_type,
                        "type": e.entry_type,
                        "file_name": e.context.file_name,
                        "timestamp": e.timestamp,
                        "tags": e.semantic_tags,
                        "data": e.data,
                    })
                })
            })
            .collect();

        let found = !results.is_empty();
        let mut response = json!({
            "found": found,
            "entries": results,
            "total_found": ranked.len(),
            "search_metrics": {
                "total_searched": total_searched,
                "average_relevance": average_relevance,
            },
            "recommendations": retrieval_recommendations(ranked.len()),
        });

        if !found {
            response["suggestions"] = json!(retrieval_suggestions());
        }

        response
    }

    /// ANALYZE: statistics and insight report over the current state.
    fn handle_analyze(&self, state: &mut MemoryState, ctx: &AgentContext) -> Value {
        let analysis_type = ctx
            .analysis_type
            .clone()
            .unwrap_or_else(|| "comprehensive".to_string());

        let mut report = json!({
            "type": analysis_type.as_str(),
            "memory_stats": Self::statistics_of(state),
        });

        match analysis_type.as_str() {
            "patterns" => {
                report["patterns"] = json!(self.refresh_patterns(state));
            }
            "performance" => {
                report["performance"] =
                    analysis::analyze_performance(&state.memory.entries, &state.index.recognized);
            }
            "quality" => {
                report["quality"] = analysis::analyze_quality(&state.memory.entries);
            }
            "trends" => {
                report["trends"] = analysis::analyze_trends(&state.memory.entries);
            }
            _ => {
                report["patterns"] = json!(self.refresh_patterns(state));
                report["performance"] =
                    analysis::analyze_performance(&state.memory.entries, &state.index.recognized);
                report["quality"] = analysis::analyze_quality(&state.memory.entries);
                report["trends"] = analysis::analyze_trends(&state.memory.entries);
            }
        }

        let average_quality = report["quality"]["average_quality"].as_f64().unwrap_or(
            analysis::analyze_quality(&state.memory.entries)["average_quality"]
                .as_f64()
                .unwrap_or(0.0),
        );

        report["insights"] = json!(analysis::generate_insights(
            &state.memory.entries,
            &state.index.recognized,
            average_quality,
        ));
        report["recommendations"] = json!(analysis::generate_recommendations(
            &state.memory.entries,
            &state.index.recognized,
        ));

        report
    }

    /// LEARN: run the continuous-learning pass.
    fn handle_learn(&self, state: &mut MemoryState) -> Value {
        let report =
            analysis::continuous_learning(&mut state.memory.entries, &state.index.recognized);
        let total_improvements = report.improvements.len();

        json!({
            "learning_actions": report.actions,
            "improvements": report.improvements,
            "metrics": {
                "total_improvements": total_improvements,
                "learning_effectiveness": report.learning_effectiveness,
            },
        })
    }

    /// OPTIMIZE: run the full maintenance pass.
    fn handle_optimize(&self, state: &mut MemoryState) -> Value {
        let report = self.run_maintenance(state);
        json!(report)
    }

    /// Expire, compress, reindex, prune. Each step independently
    /// skippable if nothing qualifies.
    fn run_maintenance(&self, state: &mut MemoryState) -> MaintenanceReport {
        let now = Utc::now();
        let compression = &self.learning.compression;
        let mut report = MaintenanceReport::default();

        report.expired =
            maintenance::expire_entries(&mut state.memory.entries, compression, now);
        if report.expired > 0 {
            report
                .actions
                .push(format!("Cleaned {} expired entries", report.expired));
        }

        report.compressed =
            maintenance::compress_entries(&mut state.memory.entries, compression, now);
        if report.compressed > 0 {
            report
                .actions
                .push(format!("Compressed {} old entries", report.compressed));
        }

        state.index.indices = maintenance::rebuild_indices(&state.memory.entries);
        report.actions.push("Updated search indices".to_string());

        report.patterns_pruned =
            patterns::prune(&mut state.index.recognized, &self.learning.patterns);
        if report.patterns_pruned > 0 {
            report
                .actions
                .push(format!("Pruned {} patterns", report.patterns_pruned));
        }

        info!(
            "Memory maintenance complete: {} actions taken",
            report.actions.len()
        );
        report
    }

    /// Run recognition over the current entries, append novel patterns,
    /// and enforce the pattern cap. Returns the newly added patterns.
    fn refresh_patterns(&self, state: &mut MemoryState) -> Vec<Pattern> {
        let new_patterns = patterns::recognize(
            &state.memory.entries,
            &state.index.recognized,
            &self.learning.patterns,
        );

        if !new_patterns.is_empty() {
            debug!("Recognized {} new pattern(s)", new_patterns.len());
            state.index.recognized.extend(new_patterns.clone());
            patterns::enforce_cap(
                &mut state.index.recognized,
                self.learning.patterns.max_patterns,
            );
        }

        new_patterns
    }

    /// Update the running learning metrics with a freshly built entry.
    fn update_learning_metrics(&self, state: &mut MemoryState, entry: &MemoryEntry) {
        let metrics = &mut state.memory.metadata.learning;
        metrics.total_entries += 1;
        let n = metrics.total_entries as f64;

        if let Some(success) = entry.data.get("success").and_then(Value::as_bool) {
            let value = if success { 1.0 } else { 0.0 };
            metrics.success_rate = (metrics.success_rate * (n - 1.0) + value) / n;
        }

        metrics.average_quality =
            (metrics.average_quality * (n - 1.0) + entry.quality.overall) / n;
        metrics.last_pattern_count = entry.extracted_patterns.len();
    }

    /// Rewrite both durable documents; failures are logged and swallowed
    /// so the in-memory state keeps operating without persistence.
    fn persist(&self, state: &mut MemoryState) {
        state.memory.metadata.last_update = Some(Utc::now());
        state.memory.metadata.total_entries = state.memory.entries.len();
        state.index.last_update = Some(Utc::now());

        if let Some(path) = &self.memory_path {
            store::save_best_effort(path, &state.memory);
        }
        if let Some(path) = &self.index_path {
            store::save_best_effort(path, &state.index);
        }
    }
}

#[async_trait]
impl Agent for MemoryAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Vec<String> {
        vec![
            "knowledge-management".to_string(),
            "pattern-recognition".to_string(),
            "continuous-learning".to_string(),
            "memory-storage".to_string(),
        ]
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn wants_workflow_results(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<Value, EngineError> {
        let action = ctx.action.unwrap_or(MemoryAction::Store);
        debug!("Memory operation: {:?}", action);

        let mut state = self.lock_state();
        let state = &mut *state;

        let payload = match action {
            MemoryAction::Store => ("stored", self.handle_store(state, ctx)),
            MemoryAction::Retrieve => ("retrieved", self.handle_retrieve(state, ctx)),
            MemoryAction::Analyze => ("analysis", self.handle_analyze(state, ctx)),
            MemoryAction::Learn => ("learning", self.handle_learn(state)),
            MemoryAction::Optimize => ("optimization", self.handle_optimize(state)),
        };

        // Post-operation upkeep: refresh recognized patterns and the
        // inverted indices, then run maintenance on its deterministic
        // cadence
        self.refresh_patterns(state);
        state.index.indices = maintenance::rebuild_indices(&state.memory.entries);

        if action == MemoryAction::Store
            && state.store_count % self.learning.compression.maintenance_interval == 0
        {
            self.run_maintenance(state);
        }

        self.persist(state);

        let mut result = json!({
            "action": action,
            "timestamp": Utc::now(),
            "success": true,
            "metadata": Self::statistics_of(state),
        });
        result[payload.0] = payload.1;

        Ok(result)
    }
}

/// Suggestions returned when a retrieval finds nothing.
fn retrieval_suggestions() -> Vec<String> {
    vec![
        "Try searching by file type (e.g. \"rs\", \"ts\")".to_string(),
        "Search by domain (e.g. \"api\", \"auth\")".to_string(),
        "Use status terms (e.g. \"error\", \"success\", \"warning\")".to_string(),
        "Prefer older results with the time preference option".to_string(),
    ]
}

/// Follow-up hints based on how many results came back.
fn retrieval_recommendations(found: usize) -> Vec<String> {
    if found == 0 {
        vec![
            "Try broader search terms".to_string(),
            "Check for typos in your query".to_string(),
        ]
    } else if found < 3 {
        vec![
            "Try related search terms".to_string(),
            "Consider searching by file type or domain".to_string(),
        ]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> MemoryAgent {
        MemoryAgent::new(LearningConfig::default(), MemorySettings::default())
    }

    fn store_ctx(data: Value) -> AgentContext {
        let mut ctx = AgentContext::for_action(MemoryAction::Store);
        ctx.data_to_store = Some(data);
        ctx
    }

    fn retrieve_ctx(query: &str) -> AgentContext {
        let mut ctx = AgentContext::for_action(MemoryAction::Retrieve);
        ctx.query = Some(query.to_string());
        ctx
    }

    #[tokio::test]
    async fn test_store_then_retrieve_roundtrip() {
        let memory = agent();

        let result = memory
            .execute(&store_ctx(json!({
                "success": true,
                "summary": "refactored the pagination helper",
            })))
            .await
            .unwrap();
        assert_eq!(result["stored"]["stored"], true);
        assert_eq!(memory.entry_count(), 1);

        // A term taken verbatim from the payload must come back
        let retrieved = memory.execute(&retrieve_ctx("pagination")).await.unwrap();
        assert_eq!(retrieved["retrieved"]["found"], true);
        let first = &retrieved["retrieved"]["entries"][0];
        assert!(first["relevance"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_retrieve_empty_memory_gives_suggestions() {
        let memory = agent();

        let result = memory.execute(&retrieve_ctx("anything")).await.unwrap();
        assert_eq!(result["retrieved"]["found"], false);
        assert!(!result["retrieved"]["suggestions"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_store_without_data_reports_not_stored() {
        let memory = agent();
        let ctx = AgentContext::for_action(MemoryAction::Store);

        let result = memory.execute(&ctx).await.unwrap();
        assert_eq!(result["stored"]["stored"], false);
        assert_eq!(memory.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_default_action_is_store() {
        let memory = agent();
        let mut ctx = AgentContext::default();
        ctx.data_to_store = Some(json!({"success": true}));

        let result = memory.execute(&ctx).await.unwrap();
        assert_eq!(result["action"], "STORE");
        assert_eq!(memory.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_workflow_results_preferred_over_data() {
        let memory = agent();
        let mut results = std::collections::BTreeMap::new();
        results.insert(
            "validator".to_string(),
            sdk::types::AgentOutcome::success(json!({"decision": "approve"}), 5),
        );

        let mut ctx = AgentContext::for_action(MemoryAction::Store).with_workflow_results(results);
        ctx.data_to_store = Some(json!({"ignored": true}));

        let result = memory.execute(&ctx).await.unwrap();
        assert_eq!(result["stored"]["stored"], true);

        let retrieved = memory.execute(&retrieve_ctx("validator")).await.unwrap();
        assert_eq!(retrieved["retrieved"]["found"], true);
    }

    #[tokio::test]
    async fn test_pattern_stability_single_actionable_error() {
        let memory = agent();

        // The same failing scenario stored min_occurrences times
        for _ in 0..3 {
            memory
                .execute(&store_ctx(json!({
                    "success": false,
                    "error": "missing semicolon at line 14",
                })))
                .await
                .unwrap();
        }

        let state = memory.lock_state();
        let error_patterns: Vec<&Pattern> = state
            .index
            .recognized
            .iter()
            .filter(|p| p.kind == crate::memory::entry::PatternKind::Error)
            .collect();
        assert_eq!(error_patterns.len(), 1);
        assert!(error_patterns[0].actionable);
    }

    #[tokio::test]
    async fn test_analyze_comprehensive_report() {
        let memory = agent();
        for i in 0..4 {
            memory
                .execute(&store_ctx(json!({"success": i % 2 == 0})))
                .await
                .unwrap();
        }

        let mut ctx = AgentContext::for_action(MemoryAction::Analyze);
        ctx.analysis_type = Some("comprehensive".to_string());
        let result = memory.execute(&ctx).await.unwrap();

        let analysis = &result["analysis"];
        assert!(analysis["memory_stats"]["total_entries"].as_u64().unwrap() >= 4);
        assert!(analysis.get("performance").is_some());
        assert!(analysis.get("quality").is_some());
        assert!(analysis.get("trends").is_some());
        assert!(analysis.get("recommendations").is_some());
    }

    #[tokio::test]
    async fn test_learn_reports_effectiveness() {
        let memory = agent();
        for _ in 0..3 {
            memory
                .execute(&store_ctx(json!({"success": true})))
                .await
                .unwrap();
        }

        let result = memory
            .execute(&AgentContext::for_action(MemoryAction::Learn))
            .await
            .unwrap();
        assert!(result["learning"]["metrics"]["learning_effectiveness"].is_number());
    }

    #[tokio::test]
    async fn test_optimize_reports_actions() {
        let memory = agent();
        memory
            .execute(&store_ctx(json!({"success": true})))
            .await
            .unwrap();

        let result = memory
            .execute(&AgentContext::for_action(MemoryAction::Optimize))
            .await
            .unwrap();
        assert!(!result["optimization"]["actions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_reported_on_every_operation() {
        let memory = agent();
        let result = memory
            .execute(&store_ctx(json!({"success": true})))
            .await
            .unwrap();

        assert_eq!(result["metadata"]["total_entries"], 1);
        assert!(result["metadata"]["index_size"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_durable_store_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let memory_path = dir.path().join("memory.json");
        let index_path = dir.path().join("index.json");

        {
            let memory = MemoryAgent::new(LearningConfig::default(), MemorySettings::default())
                .with_store(memory_path.clone(), index_path.clone());
            memory
                .execute(&store_ctx(json!({"success": true, "summary": "persisted"})))
                .await
                .unwrap();
        }

        let reloaded = MemoryAgent::new(LearningConfig::default(), MemorySettings::default())
            .with_store(memory_path, index_path);
        assert_eq!(reloaded.entry_count(), 1);

        let result = reloaded.execute(&retrieve_ctx("persisted")).await.unwrap();
        assert_eq!(result["retrieved"]["found"], true);
    }
}
