//! Memory analysis and continuous learning
//!
//! ANALYZE produces statistics and insight reports over the entry set;
//! LEARN feeds access patterns and recognized success patterns back into
//! the per-entry relevance scores so future retrievals rank better.

use crate::memory::entry::MemoryEntry;
use crate::memory::patterns::{entry_matches, Pattern};
use crate::memory::entry::PatternKind;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One relevance adjustment made by a learning pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnImprovement {
    /// "relevance-boost" or "success-pattern-boost"
    pub kind: String,
    pub entry_id: String,
    pub old_score: f64,
    pub new_score: f64,
}

/// The result of one continuous-learning pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnReport {
    pub actions: Vec<String>,
    pub improvements: Vec<LearnImprovement>,
    pub learning_effectiveness: f64,
}

/// Run the continuous-learning pass.
///
/// 1. Entries that have been retrieved get a relevance boost proportional
///    to their access count (capped).
/// 2. Entries matching high-success outcome patterns get a multiplicative
///    boost.
pub fn continuous_learning(entries: &mut [MemoryEntry], patterns: &[Pattern]) -> LearnReport {
    let mut report = LearnReport::default();

    report.actions.push("relevance-scoring".to_string());
    for entry in entries.iter_mut() {
        if entry.access_count == 0 {
            continue;
        }
        let old = entry.relevance_score;
        let boost = (entry.access_count as f64 / 100.0).min(0.3);
        entry.relevance_score = (old + boost).min(1.0);

        if entry.relevance_score > old {
            report.improvements.push(LearnImprovement {
                kind: "relevance-boost".to_string(),
                entry_id: entry.id.clone(),
                old_score: old,
                new_score: entry.relevance_score,
            });
        }
    }

    report.actions.push("pattern-learning".to_string());
    let success_patterns: Vec<&Pattern> = patterns
        .iter()
        .filter(|p| p.kind == PatternKind::Outcome)
        .filter(|p| p.success_rate.map(|r| r > 0.8).unwrap_or(false))
        .collect();

    for pattern in success_patterns {
        for entry in entries.iter_mut() {
            if !entry_matches(entry, pattern) {
                continue;
            }
            let old = entry.relevance_score;
            entry.relevance_score = (old * 1.1).min(1.0);

            if entry.relevance_score > old {
                report.improvements.push(LearnImprovement {
                    kind: "success-pattern-boost".to_string(),
                    entry_id: entry.id.clone(),
                    old_score: old,
                    new_score: entry.relevance_score,
                });
            }
        }
    }

    report.learning_effectiveness = learning_effectiveness(patterns);
    report
}

/// Mean pattern confidence averaged with the actionable ratio.
pub fn learning_effectiveness(patterns: &[Pattern]) -> f64 {
    if patterns.is_empty() {
        return 0.0;
    }

    let avg_confidence =
        patterns.iter().map(|p| p.confidence).sum::<f64>() / patterns.len() as f64;
    let actionable_ratio =
        patterns.iter().filter(|p| p.actionable).count() as f64 / patterns.len() as f64;

    (avg_confidence + actionable_ratio) / 2.0
}

/// Performance view: size, relevance, access patterns, storage efficiency.
pub fn analyze_performance(entries: &[MemoryEntry], patterns: &[Pattern]) -> Value {
    let total_accesses: u64 = entries.iter().map(|e| e.access_count).sum();
    let never_accessed = entries.iter().filter(|e| e.access_count == 0).count();

    let mut by_access: Vec<&MemoryEntry> = entries.iter().collect();
    by_access.sort_by(|a, b| b.access_count.cmp(&a.access_count));
    let most_accessed: Vec<Value> = by_access
        .iter()
        .take(5)
        .map(|e| {
            json!({
                "id": e.id,
                "type": e.entry_type,
                "access_count": e.access_count,
            })
        })
        .collect();

    let compressed = entries.iter().filter(|e| e.compressed).count();
    let total_storage: usize = entries.iter().map(|e| e.data.to_string().len()).sum();
    let average_entry_size = if entries.is_empty() {
        0
    } else {
        total_storage / entries.len()
    };

    json!({
        "memory_size": entries.len(),
        "average_relevance": average_relevance(entries),
        "access_patterns": {
            "total_accesses": total_accesses,
            "most_accessed": most_accessed,
            "never_accessed": never_accessed,
        },
        "storage_efficiency": {
            "compression_rate": if entries.is_empty() { 0.0 } else { compressed as f64 / entries.len() as f64 },
            "average_entry_size": average_entry_size,
            "total_storage": total_storage,
        },
        "learning_effectiveness": learning_effectiveness(patterns),
    })
}

/// Quality view: aggregates over the per-entry quality metrics.
pub fn analyze_quality(entries: &[MemoryEntry]) -> Value {
    let high_quality = entries.iter().filter(|e| e.quality.overall > 0.8).count();
    let average_quality = if entries.is_empty() {
        0.0
    } else {
        entries.iter().map(|e| e.quality.overall).sum::<f64>() / entries.len() as f64
    };

    json!({
        "total_entries": entries.len(),
        "high_quality_entries": high_quality,
        "average_quality": average_quality,
        "recommendation": if average_quality < 0.6 {
            "Focus on quality improvements"
        } else {
            "Quality is acceptable"
        },
    })
}

/// Trend view: volume per day and the success-rate trajectory over the
/// last four weeks.
pub fn analyze_trends(entries: &[MemoryEntry]) -> Value {
    let now = Utc::now();

    let mut weekly: [(u64, u64); 4] = [(0, 0); 4];
    for entry in entries {
        let weeks_ago = (now - entry.timestamp).num_weeks();
        if !(0..4).contains(&weeks_ago) {
            continue;
        }
        let bucket = &mut weekly[3 - weeks_ago as usize];
        if let Some(success) = entry.data.get("success").and_then(Value::as_bool) {
            bucket.1 += 1;
            if success {
                bucket.0 += 1;
            }
        }
    }

    let rates: Vec<f64> = weekly
        .iter()
        .filter(|(_, total)| *total > 0)
        .map(|(successes, total)| *successes as f64 / *total as f64)
        .collect();

    let trend = match (rates.first(), rates.last()) {
        (Some(first), Some(last)) if rates.len() > 1 && last > first => "improving",
        (Some(first), Some(last)) if rates.len() > 1 && last < first => "declining",
        _ => "stable",
    };

    let days_spanned = entries
        .iter()
        .map(|e| (now - e.timestamp).num_days())
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    json!({
        "daily_average": entries.len() as f64 / days_spanned,
        "current_success_rate": rates.last().copied().unwrap_or(0.0),
        "trend": trend,
    })
}

/// Derived insights flagged for the operator.
pub fn generate_insights(
    entries: &[MemoryEntry],
    patterns: &[Pattern],
    average_quality: f64,
) -> Vec<String> {
    let mut insights = Vec::new();

    if learning_effectiveness(patterns) < 0.5 {
        insights.push("Learning effectiveness is low - consider running memory optimization".into());
    }

    if !entries.is_empty() && average_quality < 0.6 {
        insights.push("Average quality is below expectations - review validation patterns".into());
    }

    let actionable = patterns.iter().filter(|p| p.actionable).count();
    if actionable > 0 {
        insights.push(format!("{} patterns require attention - run pattern analysis", actionable));
    }

    insights
}

/// Actionable follow-ups based on the current state.
pub fn generate_recommendations(entries: &[MemoryEntry], patterns: &[Pattern]) -> Vec<String> {
    let mut recommendations = Vec::new();

    if entries.len() > 500 {
        recommendations.push("Consider running memory optimization to improve performance".into());
    }

    let critical = patterns
        .iter()
        .filter(|p| p.actionable && p.confidence > 0.8)
        .count();
    if critical > 0 {
        recommendations.push(format!(
            "Address {} high-confidence issues identified in patterns",
            critical
        ));
    }

    recommendations.push("Run continuous learning to improve agent effectiveness".into());
    recommendations
}

/// Mean relevance over a set of entries.
pub fn average_relevance(entries: &[MemoryEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    entries.iter().map(|e| e.relevance_score).sum::<f64>() / entries.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternConfig;
    use crate::memory::entry::build_entry;
    use crate::memory::patterns::recognize;
    use sdk::agent::AgentContext;
    use serde_json::json;

    fn entries_with_outcomes(successes: usize, failures: usize) -> Vec<MemoryEntry> {
        (0..successes + failures)
            .map(|i| {
                build_entry(
                    &json!({"success": i < successes}),
                    &AgentContext::for_file("a.rs", "code", "test"),
                    &[],
                )
            })
            .collect()
    }

    #[test]
    fn test_access_boost_learning() {
        let mut entries = entries_with_outcomes(1, 0);
        entries[0].access_count = 50;
        let before = entries[0].relevance_score;

        let report = continuous_learning(&mut entries, &[]);

        assert!(entries[0].relevance_score > before);
        assert!(report
            .improvements
            .iter()
            .any(|i| i.kind == "relevance-boost"));
    }

    #[test]
    fn test_success_pattern_boost() {
        // Ten corroborating entries put the outcome pattern over the
        // confidence threshold
        let mut entries = entries_with_outcomes(10, 0);
        let patterns = recognize(&entries, &[], &PatternConfig::default());
        assert!(!patterns.is_empty());
        let before = entries[0].relevance_score;

        let report = continuous_learning(&mut entries, &patterns);

        assert!(entries[0].relevance_score > before);
        assert!(report
            .improvements
            .iter()
            .any(|i| i.kind == "success-pattern-boost"));
    }

    #[test]
    fn test_learning_effectiveness_empty() {
        assert_eq!(learning_effectiveness(&[]), 0.0);
    }

    #[test]
    fn test_performance_report_shape() {
        let entries = entries_with_outcomes(2, 1);
        let report = analyze_performance(&entries, &[]);

        assert_eq!(report["memory_size"], 3);
        assert!(report["average_relevance"].as_f64().unwrap() > 0.0);
        assert_eq!(report["access_patterns"]["never_accessed"], 3);
    }

    #[test]
    fn test_quality_report() {
        let entries = entries_with_outcomes(2, 0);
        let report = analyze_quality(&entries);
        assert_eq!(report["total_entries"], 2);
        assert!(report["average_quality"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_trends_stable_with_one_window() {
        let entries = entries_with_outcomes(3, 1);
        let report = analyze_trends(&entries);
        assert_eq!(report["trend"], "stable");
        assert!(report["current_success_rate"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_insights_flag_actionable_patterns() {
        let entries = entries_with_outcomes(2, 8);
        let patterns = recognize(&entries, &[], &PatternConfig::default());
        let insights = generate_insights(&entries, &patterns, 0.7);

        assert!(insights.iter().any(|i| i.contains("require attention")));
    }
}
