//! Memory maintenance
//!
//! Periodic housekeeping over the entry set: expiry of stale entries,
//! payload compression for aging entries, inverted-index rebuilds, and
//! capacity eviction. Each step is independently skippable when nothing
//! qualifies. Triggered after every Nth STORE or explicitly via OPTIMIZE.

use crate::config::CompressionConfig;
use crate::memory::entry::MemoryEntry;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// What one maintenance run did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub expired: usize,
    pub compressed: usize,
    pub evicted: usize,
    pub patterns_pruned: usize,
    pub actions: Vec<String>,
}

/// Inverted indices rebuilt from the current entry set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvertedIndices {
    /// keyword -> entry ids
    pub terms: BTreeMap<String, Vec<String>>,

    /// semantic tag -> entry ids
    pub tags: BTreeMap<String, Vec<String>>,

    /// "kind:key" pattern candidate -> entry ids
    pub patterns: BTreeMap<String, Vec<String>>,
}

/// Expire entries older than the retention window, unless they are
/// important (importance > 0.8) or frequently accessed (access > 10).
pub fn expire_entries(
    entries: &mut Vec<MemoryEntry>,
    config: &CompressionConfig,
    now: DateTime<Utc>,
) -> usize {
    let cutoff = now - Duration::days(config.retention_days);
    let before = entries.len();

    entries.retain(|entry| {
        let is_recent = entry.timestamp > cutoff;
        let is_important = entry.importance > 0.8;
        let is_frequently_accessed = entry.access_count > 10;
        is_recent || is_important || is_frequently_accessed
    });

    let removed = before - entries.len();
    if removed > 0 {
        debug!("Expired {} stale entries", removed);
    }
    removed
}

/// Compress entries older than the compression window by replacing their
/// payload with a fixed-shape summary, keeping the original size for
/// inspection.
pub fn compress_entries(
    entries: &mut [MemoryEntry],
    config: &CompressionConfig,
    now: DateTime<Utc>,
) -> usize {
    if !config.enabled {
        return 0;
    }

    let cutoff = now - Duration::days(config.compression_days);
    let mut compressed = 0;

    for entry in entries.iter_mut() {
        if entry.compressed || entry.timestamp >= cutoff {
            continue;
        }

        entry.original_data_size = Some(entry.data.to_string().len());
        entry.data = summarize_data(&entry.data);
        entry.compressed = true;
        compressed += 1;
    }

    compressed
}

/// The fixed-shape summary a compressed entry keeps.
pub fn summarize_data(data: &Value) -> Value {
    let issue_count = ["issues", "violations"]
        .iter()
        .filter_map(|key| data.get(key).and_then(Value::as_array))
        .map(|a| a.len())
        .sum::<usize>();

    json!({
        "compressed": true,
        "summary": {
            "success": data.get("success").cloned().unwrap_or(Value::Null),
            "rating": data.get("rating").cloned().unwrap_or(Value::Null),
            "decision": data.get("decision").cloned().unwrap_or(Value::Null),
            "issue_count": issue_count,
        }
    })
}

/// Rebuild the keyword, tag and pattern inverted indices from scratch.
pub fn rebuild_indices(entries: &[MemoryEntry]) -> InvertedIndices {
    let mut indices = InvertedIndices::default();

    for entry in entries {
        for keyword in &entry.keywords {
            indices
                .terms
                .entry(keyword.word.clone())
                .or_default()
                .push(entry.id.clone());
        }

        for tag in &entry.semantic_tags {
            indices
                .tags
                .entry(tag.clone())
                .or_default()
                .push(entry.id.clone());
        }

        for candidate in &entry.extracted_patterns {
            let key = format!(
                "{}:{}",
                serde_json::to_string(&candidate.kind)
                    .unwrap_or_default()
                    .trim_matches('"'),
                candidate.key
            );
            indices.patterns.entry(key).or_default().push(entry.id.clone());
        }
    }

    indices
}

/// Evict the lowest-value entries once the capacity is exceeded, keeping
/// the highest importance x relevance x ln(access + 1).
pub fn evict_capacity(entries: &mut Vec<MemoryEntry>, capacity: usize) -> usize {
    if entries.len() <= capacity {
        return 0;
    }

    entries.sort_by(|a, b| {
        retention_score(b)
            .partial_cmp(&retention_score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let removed = entries.len() - capacity;
    entries.truncate(capacity);
    debug!("Evicted {} lower-value entries", removed);
    removed
}

fn retention_score(entry: &MemoryEntry) -> f64 {
    entry.importance * entry.relevance_score * ((entry.access_count + 1) as f64).ln().max(0.1)
}
