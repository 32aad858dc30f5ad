//! Pattern recognition
//!
//! Statistical recognition of recurring conditions across memory entries.
//! Three independent recognizers run over the full entry set:
//!
//! - **Outcome**: success rate per (file basename, entry type) group
//! - **File type**: issue rate and average quality per file extension
//! - **Error**: recurring normalized error/violation messages
//!
//! A pattern only ever exists once at least `min_occurrences` entries
//! corroborate it; a single occurrence can never produce one. Known
//! patterns are reinforced at ingestion time instead of being recognized
//! again.

use crate::config::PatternConfig;
use crate::memory::entry::{file_basename, file_extension, MemoryEntry, PatternKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A statistically recognized recurring condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,

    /// Stable key within the kind, e.g. "users.rs_file-analysis"
    pub key: String,

    /// Certainty that the pattern is real, in [0, 1]
    pub confidence: f64,

    /// Number of corroborating observations
    pub frequency: u64,

    /// Whether the pattern warrants action
    pub actionable: bool,

    /// Human-readable description
    pub description: String,

    /// Suggested follow-up when actionable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,

    /// Outcome patterns: success / total
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,

    /// File-type patterns: entries with issues / total
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_rate: Option<f64>,

    /// File-type patterns: mean overall quality
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_quality: Option<f64>,
}

impl Pattern {
    /// Ranking score used when the pattern set is pruned.
    pub fn effectiveness(&self) -> f64 {
        self.confidence * ((self.frequency + 1) as f64).ln()
    }
}

/// Run all recognizers and keep only confident, novel patterns.
///
/// Returns an empty set when fewer than `min_occurrences` entries exist.
pub fn recognize(
    entries: &[MemoryEntry],
    existing: &[Pattern],
    config: &PatternConfig,
) -> Vec<Pattern> {
    if entries.len() < config.min_occurrences {
        return Vec::new();
    }

    let mut found = Vec::new();
    found.extend(recognize_outcomes(entries, config));
    found.extend(recognize_file_types(entries, config));
    found.extend(recognize_errors(entries, config));

    found
        .into_iter()
        .filter(|p| p.confidence >= config.confidence_threshold)
        .filter(|p| !is_known(existing, p.kind, &p.key))
        .collect()
}

/// Success/failure rates per (file basename, entry type) group.
fn recognize_outcomes(entries: &[MemoryEntry], config: &PatternConfig) -> Vec<Pattern> {
    let mut groups: BTreeMap<String, (u64, u64)> = BTreeMap::new();

    for entry in entries {
        let Some(success) = entry.data.get("success").and_then(Value::as_bool) else {
            continue;
        };
        let key = outcome_key(entry);
        let group = groups.entry(key).or_insert((0, 0));
        group.1 += 1;
        if success {
            group.0 += 1;
        }
    }

    groups
        .into_iter()
        .filter(|(_, (_, total))| *total as usize >= config.min_occurrences)
        .map(|(key, (successes, total))| {
            let success_rate = successes as f64 / total as f64;
            let actionable = success_rate < 0.8;
            Pattern {
                kind: PatternKind::Outcome,
                description: format!(
                    "{}: {}% success rate",
                    key,
                    (success_rate * 100.0).round()
                ),
                recommendation: actionable
                    .then(|| format!("Investigate failures in {}", key)),
                key,
                confidence: (total as f64 / 10.0).min(1.0),
                frequency: total,
                actionable,
                success_rate: Some(success_rate),
                issue_rate: None,
                average_quality: None,
            }
        })
        .collect()
}

/// Issue rate and average quality per file extension.
fn recognize_file_types(entries: &[MemoryEntry], config: &PatternConfig) -> Vec<Pattern> {
    struct Group {
        count: u64,
        issues: u64,
        quality_sum: f64,
    }

    let mut groups: BTreeMap<String, Group> = BTreeMap::new();

    for entry in entries {
        let Some(ext) = entry.context.file_name.as_deref().and_then(file_extension) else {
            continue;
        };
        let group = groups.entry(ext).or_insert(Group {
            count: 0,
            issues: 0,
            quality_sum: 0.0,
        });
        group.count += 1;
        group.quality_sum += entry.quality.overall;
        if has_issues(&entry.data) {
            group.issues += 1;
        }
    }

    groups
        .into_iter()
        .filter(|(_, g)| g.count as usize >= config.min_occurrences)
        .map(|(ext, g)| {
            let issue_rate = g.issues as f64 / g.count as f64;
            let actionable = issue_rate > 0.3;
            Pattern {
                kind: PatternKind::Filetype,
                description: format!(
                    ".{} files: {}% clean rate",
                    ext,
                    ((1.0 - issue_rate) * 100.0).round()
                ),
                recommendation: actionable
                    .then(|| format!("Review .{} file patterns - high issue rate", ext)),
                key: ext,
                confidence: (g.count as f64 / 20.0).min(1.0),
                frequency: g.count,
                actionable,
                success_rate: None,
                issue_rate: Some(issue_rate),
                average_quality: Some(g.quality_sum / g.count as f64),
            }
        })
        .collect()
}

/// Recurring normalized error and violation messages.
///
/// Always actionable once frequent enough: recurring errors are worth
/// surfacing regardless of rate.
fn recognize_errors(entries: &[MemoryEntry], config: &PatternConfig) -> Vec<Pattern> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for entry in entries {
        for key in error_keys(&entry.data) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count as usize >= config.min_occurrences)
        .map(|(key, count)| Pattern {
            kind: PatternKind::Error,
            description: format!("Recurring error: {} ({} times)", key, count),
            recommendation: Some(format!("Address recurring error pattern: {}", key)),
            key,
            // Saturates at min_occurrences: a recurring error is already
            // certain enough to surface
            confidence: (count as f64 / config.min_occurrences as f64).min(1.0),
            frequency: count,
            actionable: true,
            success_rate: None,
            issue_rate: None,
            average_quality: None,
        })
        .collect()
}

/// All normalized error keys a single entry contributes.
fn error_keys(data: &Value) -> Vec<String> {
    let mut keys = Vec::new();

    if let Some(error) = data.get("error").and_then(Value::as_str) {
        keys.push(normalize_error(error));
    }

    if let Some(violations) = data.get("violations").and_then(Value::as_array) {
        for violation in violations {
            let key = violation
                .get("rule")
                .or_else(|| violation.get("type"))
                .and_then(Value::as_str)
                .map(String::from)
                .or_else(|| violation.as_str().map(normalize_error))
                .unwrap_or_else(|| "unknown-violation".to_string());
            keys.push(key);
        }
    }

    keys
}

/// Whether a recognized pattern already covers this (kind, key).
pub fn is_known(existing: &[Pattern], kind: PatternKind, key: &str) -> bool {
    existing.iter().any(|p| p.kind == kind && p.key == key)
}

/// Whether one entry exhibits a recognized pattern.
pub fn entry_matches(entry: &MemoryEntry, pattern: &Pattern) -> bool {
    match pattern.kind {
        PatternKind::Outcome => outcome_key(entry) == pattern.key,
        PatternKind::Filetype => entry
            .context
            .file_name
            .as_deref()
            .and_then(file_extension)
            .map(|ext| ext == pattern.key)
            .unwrap_or(false),
        PatternKind::Error => error_keys(&entry.data).iter().any(|k| k == &pattern.key),
        _ => false,
    }
}

/// Reinforce every recognized pattern the new entry exhibits:
/// frequency up, confidence nudged towards 1.
pub fn reinforce(recognized: &mut [Pattern], entry: &MemoryEntry, config: &PatternConfig) -> usize {
    let mut reinforced = 0;
    for pattern in recognized.iter_mut() {
        if entry_matches(entry, pattern) {
            pattern.frequency += 1;
            pattern.confidence = (pattern.confidence + config.reinforcement).min(1.0);
            reinforced += 1;
        }
    }
    reinforced
}

/// Drop patterns that fell below the confidence threshold unless they are
/// both frequent and actionable, then re-sort by effectiveness.
pub fn prune(recognized: &mut Vec<Pattern>, config: &PatternConfig) -> usize {
    let before = recognized.len();

    recognized.retain(|p| {
        let confident = p.confidence >= config.confidence_threshold;
        let frequent = p.frequency as usize >= config.min_occurrences;
        confident && (frequent || p.actionable)
    });

    recognized.sort_by(|a, b| {
        b.effectiveness()
            .partial_cmp(&a.effectiveness())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    before - recognized.len()
}

/// Enforce the configured pattern cap, keeping the highest
/// confidence x frequency.
pub fn enforce_cap(recognized: &mut Vec<Pattern>, max_patterns: usize) {
    if recognized.len() <= max_patterns {
        return;
    }

    recognized.sort_by(|a, b| {
        let a_score = a.confidence * a.frequency as f64;
        let b_score = b.confidence * b.frequency as f64;
        b_score
            .partial_cmp(&a_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    recognized.truncate(max_patterns);
}

fn outcome_key(entry: &MemoryEntry) -> String {
    let basename = entry
        .context
        .file_name
        .as_deref()
        .map(file_basename)
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}_{}", basename, entry.entry_type)
}

fn has_issues(data: &Value) -> bool {
    ["violations", "issues"].iter().any(|key| {
        data.get(key)
            .and_then(Value::as_array)
            .map(|a| !a.is_empty())
            .unwrap_or(false)
    })
}

fn digit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

/// Normalize an error message so recurring errors group together:
/// lowercase, digits collapsed to a placeholder, quotes stripped,
/// whitespace collapsed. Idempotent, so stored keys can be re-normalized.
pub fn normalize_error(error: &str) -> String {
    let lowered = error.to_lowercase();
    let without_digits = digit_regex().replace_all(&lowered, "n");
    let without_quotes: String = without_digits
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '`'))
        .collect();

    without_quotes.split_whitespace().collect::<Vec<_>>().join(" ")
}
