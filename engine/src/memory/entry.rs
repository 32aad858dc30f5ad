//! Memory entry construction
//!
//! Turns an arbitrary execution payload plus its context into a fully
//! analyzed [`MemoryEntry`]: sanitized data, keyword and tag extraction,
//! a structural context signature, typed relationships, quality metrics,
//! pattern candidates, and the relevance/confidence/importance scores the
//! retrieval and maintenance passes rely on.

use chrono::{DateTime, Utc};
use regex::Regex;
use sdk::agent::AgentContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use uuid::Uuid;

/// Keys whose values are redacted before storage
const SENSITIVE_KEYS: [&str; 5] = ["password", "key", "token", "secret", "credential"];

/// Maximum stored string length before truncation
const MAX_STRING_LEN: usize = 10_000;

/// Maximum keywords kept per entry
const MAX_KEYWORDS: usize = 10;

/// Maximum semantic tags kept per entry
const MAX_TAGS: usize = 20;

/// One extracted keyword with its term frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    pub frequency: usize,
}

/// What kind of thing a relationship points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    File,
    Directory,
    Workflow,
    Quality,
}

/// A typed link from an entry to something in its context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationKind,
    pub target: String,
}

/// Per-entry quality metrics.
///
/// `accuracy` is a structural placeholder (structured payloads score
/// higher); `timeliness` decays with the age of the source context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub completeness: f64,
    pub accuracy: f64,
    pub relevance: f64,
    pub timeliness: f64,
    pub overall: f64,
}

/// Kind tag shared by pattern candidates and recognized patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Success/failure rate per (file, entry type) group
    Outcome,
    /// Issue rate per file extension
    Filetype,
    /// Recurring normalized error message
    Error,
    /// Candidate only: the entry's file extension
    File,
    /// Candidate only: the entry's quality rating
    Quality,
}

/// A pattern candidate extracted from a single entry at ingestion time.
///
/// Candidates never become recognized patterns on their own; recognition
/// requires the configured minimum number of corroborating entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCandidate {
    pub kind: PatternKind,
    pub key: String,
    pub confidence: f64,
}

/// The structural context signature used for context-similarity search.
///
/// Stored structurally so field-wise similarity is computable; `digest()`
/// derives the stable short hash used for display and grouping.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContextSignature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    pub domain: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<String>,

    pub has_workflow: bool,
}

impl ContextSignature {
    /// Derive the signature from an execution context.
    pub fn from_context(ctx: &AgentContext, domain_keywords: &[String]) -> Self {
        Self {
            file_type: ctx.file_name.as_deref().and_then(file_extension),
            domain: extract_domain(ctx.file_name.as_deref(), domain_keywords),
            change_type: ctx.change_type.clone(),
            has_workflow: ctx.workflow_id.is_some(),
        }
    }

    /// Fraction of fields that agree, in [0, 1].
    pub fn similarity(&self, other: &Self) -> f64 {
        let mut matches = 0u32;
        if self.file_type == other.file_type {
            matches += 1;
        }
        if self.domain == other.domain {
            matches += 1;
        }
        if self.change_type == other.change_type {
            matches += 1;
        }
        if self.has_workflow == other.has_workflow {
            matches += 1;
        }
        f64::from(matches) / 4.0
    }

    /// Stable short hash of the signature.
    pub fn digest(&self) -> String {
        let repr = format!(
            "{}|{}|{}|{}",
            self.file_type.as_deref().unwrap_or(""),
            self.domain,
            self.change_type.as_deref().unwrap_or(""),
            self.has_workflow
        );
        let hash = Sha256::digest(repr.as_bytes());
        hex::encode(&hash[..4])
    }
}

/// The unit of knowledge in the memory subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,

    /// Stable hash of the sanitized payload, for dedup detection
    pub content_hash: String,

    /// Derived from the context shape, e.g. "file-analysis"
    pub entry_type: String,

    /// Sanitized payload (secrets stripped, long strings truncated)
    pub data: Value,

    /// Sanitized relevant-context subset
    pub context: AgentContext,

    pub keywords: Vec<Keyword>,
    pub semantic_tags: Vec<String>,
    pub context_signature: ContextSignature,
    pub relationships: Vec<Relationship>,
    pub quality: QualityMetrics,
    pub extracted_patterns: Vec<PatternCandidate>,

    pub relevance_score: f64,
    pub confidence_score: f64,
    pub importance: f64,

    pub access_count: u64,
    pub last_accessed: DateTime<Utc>,

    pub compressed: bool,

    /// Size of the payload before compression, for inspection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_data_size: Option<usize>,
}

/// Build a fully analyzed entry from a payload and its context.
pub fn build_entry(data: &Value, ctx: &AgentContext, domain_keywords: &[String]) -> MemoryEntry {
    let timestamp = Utc::now();
    let sanitized = sanitize_data(data);
    let context = ctx.sanitized();

    MemoryEntry {
        id: Uuid::new_v4().to_string(),
        timestamp,
        content_hash: content_hash(&sanitized),
        entry_type: determine_entry_type(data, ctx),
        keywords: extract_keywords(&sanitized, &context),
        semantic_tags: semantic_tags(&sanitized, ctx, domain_keywords),
        context_signature: ContextSignature::from_context(ctx, domain_keywords),
        relationships: find_relationships(data, ctx),
        quality: quality_metrics(data, ctx),
        extracted_patterns: extract_pattern_candidates(data, ctx),
        relevance_score: relevance(data, ctx),
        confidence_score: confidence(data, ctx),
        importance: importance(data, ctx),
        access_count: 0,
        last_accessed: timestamp,
        compressed: false,
        original_data_size: None,
        data: sanitized,
        context,
    }
}

/// Classify the entry from the shape of its context and payload.
pub fn determine_entry_type(data: &Value, ctx: &AgentContext) -> String {
    if ctx.workflow_id.is_some() {
        "workflow-execution".to_string()
    } else if ctx.file_name.is_some() {
        "file-analysis".to_string()
    } else if data.get("error").is_some() {
        "error".to_string()
    } else if data.get("success").is_some() {
        "execution-result".to_string()
    } else {
        "general".to_string()
    }
}

/// Recursively redact sensitive keys and truncate oversized strings.
pub fn sanitize_data(data: &Value) -> Value {
    match data {
        Value::Object(map) => {
            let mut cleaned = serde_json::Map::new();
            for (key, value) in map {
                let lower = key.to_lowercase();
                if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                    cleaned.insert(key.clone(), Value::String("[REDACTED]".to_string()));
                } else {
                    cleaned.insert(key.clone(), sanitize_data(value));
                }
            }
            Value::Object(cleaned)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_data).collect()),
        Value::String(s) if s.len() > MAX_STRING_LEN => {
            let truncated: String = s.chars().take(MAX_STRING_LEN).collect();
            Value::String(format!("{}...[truncated]", truncated))
        }
        other => other.clone(),
    }
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-z]{3,}\b").expect("static regex"))
}

/// Extract the top keywords (by frequency) from payload plus context.
pub fn extract_keywords(data: &Value, ctx: &AgentContext) -> Vec<Keyword> {
    let combined = format!(
        "{} {}",
        data.to_string().to_lowercase(),
        serde_json::to_string(ctx).unwrap_or_default().to_lowercase()
    );

    let mut frequency: BTreeMap<&str, usize> = BTreeMap::new();
    for m in word_regex().find_iter(&combined) {
        *frequency.entry(m.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(word, frequency)| Keyword {
            word: word.to_string(),
            frequency,
        })
        .collect()
}

/// Derive semantic tags from path segments, the file extension, status
/// words, declared domain keywords, and quality markers in the payload.
pub fn semantic_tags(data: &Value, ctx: &AgentContext, domain_keywords: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: String| {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    };

    if let Some(file_name) = &ctx.file_name {
        for part in file_name.split('/') {
            if part.len() > 2 {
                push(format!("path:{}", part));
            }
        }
        if let Some(ext) = file_extension(file_name) {
            push(format!("type:{}", ext));
        }
    }

    if let Some(change) = &ctx.change_type {
        push(format!("change:{}", change));
    }

    let data_str = data.to_string().to_lowercase();

    for status in ["error", "success", "warning"] {
        if data_str.contains(status) {
            push(format!("status:{}", status));
        }
    }

    for keyword in domain_keywords {
        if data_str.contains(keyword.as_str()) {
            push(format!("domain:{}", keyword));
        }
    }

    for quality in ["violation", "security", "performance"] {
        if data_str.contains(quality) {
            push(format!("quality:{}", quality));
        }
    }

    tags.truncate(MAX_TAGS);
    tags
}

/// Typed relationships: file, directory, workflow, quality rating.
pub fn find_relationships(data: &Value, ctx: &AgentContext) -> Vec<Relationship> {
    let mut relationships = Vec::new();

    if let Some(file_name) = &ctx.file_name {
        relationships.push(Relationship {
            kind: RelationKind::File,
            target: file_name.clone(),
        });

        if let Some(dir) = Path::new(file_name).parent() {
            let dir = dir.to_string_lossy();
            if !dir.is_empty() {
                relationships.push(Relationship {
                    kind: RelationKind::Directory,
                    target: dir.to_string(),
                });
            }
        }
    }

    if let Some(workflow_id) = &ctx.workflow_id {
        relationships.push(Relationship {
            kind: RelationKind::Workflow,
            target: workflow_id.clone(),
        });
    }

    if let Some(rating) = data.get("rating").and_then(Value::as_str) {
        relationships.push(Relationship {
            kind: RelationKind::Quality,
            target: rating.to_string(),
        });
    }

    relationships
}

/// Quality metrics for the entry; `overall` is the mean of the factors.
pub fn quality_metrics(data: &Value, ctx: &AgentContext) -> QualityMetrics {
    let completeness = {
        let mut score: f64 = 0.5;
        if !data.is_null() {
            score += 0.2;
        }
        if ctx.file_name.is_some() {
            score += 0.1;
        }
        if ctx.timestamp.is_some() {
            score += 0.1;
        }
        if data.get("summary").is_some() {
            score += 0.1;
        }
        score.min(1.0)
    };

    let accuracy = if data.is_object() { 0.8 } else { 0.6 };
    let relevance = relevance(data, ctx);
    let timeliness = timeliness(ctx);
    let overall = (completeness + accuracy + relevance + timeliness) / 4.0;

    QualityMetrics {
        completeness,
        accuracy,
        relevance,
        timeliness,
        overall,
    }
}

/// Timeliness decays with the age of the source context.
fn timeliness(ctx: &AgentContext) -> f64 {
    let Some(timestamp) = ctx.timestamp else {
        return 0.5;
    };

    let hours = (Utc::now() - timestamp).num_hours();
    if hours < 1 {
        1.0
    } else if hours < 24 {
        0.9
    } else if hours < 168 {
        0.7
    } else {
        0.5
    }
}

/// Pattern candidates immediately extractable from one entry.
pub fn extract_pattern_candidates(data: &Value, ctx: &AgentContext) -> Vec<PatternCandidate> {
    let mut candidates = Vec::new();

    if let Some(ext) = ctx.file_name.as_deref().and_then(file_extension) {
        candidates.push(PatternCandidate {
            kind: PatternKind::File,
            key: ext,
            confidence: 0.9,
        });
    }

    if let Some(success) = data.get("success").and_then(Value::as_bool) {
        candidates.push(PatternCandidate {
            kind: PatternKind::Outcome,
            key: if success { "success" } else { "failure" }.to_string(),
            confidence: 0.8,
        });
    }

    if let Some(rating) = data.get("rating").and_then(Value::as_str) {
        candidates.push(PatternCandidate {
            kind: PatternKind::Quality,
            key: rating.to_string(),
            confidence: 0.7,
        });
    }

    candidates
}

/// Additive relevance heuristic over context and payload richness.
pub fn relevance(data: &Value, ctx: &AgentContext) -> f64 {
    let mut score: f64 = 0.5;

    if ctx.file_name.is_some() {
        score += 0.1;
    }
    if ctx.change_type.is_some() {
        score += 0.1;
    }
    if ctx.workflow_id.is_some() {
        score += 0.1;
    }

    if data.get("success").is_some() {
        score += 0.1;
    }
    if nonempty_array(data, "issues") || nonempty_array(data, "violations") {
        score += 0.1;
    }
    if data.get("rating").is_some() || data.get("decision").is_some() {
        score += 0.1;
    }

    score.min(1.0)
}

/// Additive confidence heuristic over payload structure.
pub fn confidence(data: &Value, ctx: &AgentContext) -> f64 {
    let mut score: f64 = 0.7;

    if data.get("success").is_some() {
        score += 0.1;
    }
    if data.get("timestamp").is_some() {
        score += 0.05;
    }
    if data.get("summary").is_some() {
        score += 0.1;
    }

    if ctx.file_name.is_some() {
        score += 0.05;
    }
    if ctx.workflow_id.is_some() {
        score += 0.05;
    }

    score.min(1.0)
}

/// Importance drives retention during maintenance.
pub fn importance(data: &Value, ctx: &AgentContext) -> f64 {
    let mut score: f64 = 0.5;

    if data.get("error").is_some() || nonempty_array(data, "violations") {
        score += 0.3;
    }

    let good_rating = data
        .get("rating")
        .and_then(Value::as_str)
        .map(|r| r.contains("Good") || r.contains("Excellent"))
        .unwrap_or(false);
    if data.get("success").and_then(Value::as_bool) == Some(true) && good_rating {
        score += 0.1;
    }

    if ctx
        .file_name
        .as_deref()
        .map(|f| f.contains("/api/"))
        .unwrap_or(false)
    {
        score += 0.2;
    }

    score.min(1.0)
}

/// Stable hash of the sanitized payload.
pub fn content_hash(data: &Value) -> String {
    let hash = Sha256::digest(data.to_string().as_bytes());
    hex::encode(&hash[..8])
}

/// Lowercased extension without the leading dot.
pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Base name of a path, used for outcome-pattern grouping.
pub fn file_basename(file_name: &str) -> String {
    Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// The declared domain a file belongs to, from its path segments.
fn extract_domain(file_name: Option<&str>, domain_keywords: &[String]) -> String {
    if let Some(file_name) = file_name {
        for keyword in domain_keywords {
            if file_name.contains(&format!("/{}/", keyword)) {
                return keyword.clone();
            }
        }
    }
    "general".to_string()
}

fn nonempty_array(data: &Value, key: &str) -> bool {
    data.get(key)
        .and_then(Value::as_array)
        .map(|a| !a.is_empty())
        .unwrap_or(false)
}
