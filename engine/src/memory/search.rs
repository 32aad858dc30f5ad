//! Multi-dimensional retrieval scoring
//!
//! One function per search dimension, each producing independently scored
//! hits over the full entry set:
//!
//! 1. content    - term-frequency overlap with the query
//! 2. semantic   - tag-set overlap
//! 3. pattern    - pattern-candidate overlap
//! 4. context    - context-signature similarity (higher qualifying bar)
//! 5. temporal   - recency decay or age ramp, plus an access boost
//!
//! Hits are deduplicated by entry id (first pass wins per id) and then
//! re-weighted per pass type during ranking, so scores from multiple
//! passes are never summed.

use crate::config::RetrievalConfig;
use crate::memory::entry::{ContextSignature, MemoryEntry, PatternCandidate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Maximum terms taken from a query
const MAX_SEARCH_TERMS: usize = 10;

/// Which pass produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Content,
    Semantic,
    Pattern,
    Context,
    Temporal,
}

/// One scored hit from a single pass.
#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub id: String,
    pub relevance: f64,
    pub search_type: SearchType,
}

/// A hit after ranking, ready to return to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedHit {
    pub id: String,
    pub relevance: f64,
    pub search_type: SearchType,
}

/// Temporal preference mirrored from the request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recency {
    Recent,
    Old,
    Any,
}

/// Split a query into lowercase search terms of at least three characters.
pub fn extract_search_terms(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut seen = HashSet::new();

    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.len() > 2)
        .filter(|term| seen.insert(term.to_string()))
        .take(MAX_SEARCH_TERMS)
        .map(String::from)
        .collect()
}

/// Content pass: term-frequency overlap normalized by term count.
pub fn search_by_content(entries: &[MemoryEntry], terms: &[String]) -> Vec<ScoredHit> {
    if terms.is_empty() {
        return Vec::new();
    }

    entries
        .iter()
        .filter_map(|entry| {
            let haystack = serde_json::to_string(entry)
                .unwrap_or_default()
                .to_lowercase();

            let mut score = 0.0;
            let mut matched = 0usize;
            for term in terms {
                let occurrences = haystack.matches(term.as_str()).count();
                if occurrences > 0 {
                    score += occurrences as f64 * (term.len() as f64 / 10.0);
                    matched += 1;
                }
            }

            if matched == 0 {
                return None;
            }

            let total = terms.len() as f64;
            let relevance = ((score / total) * (matched as f64 / total)).min(1.0);
            Some(ScoredHit {
                id: entry.id.clone(),
                relevance,
                search_type: SearchType::Content,
            })
        })
        .collect()
}

/// Semantic pass: tag-set overlap against the larger of the two tag sets.
pub fn search_by_semantic(entries: &[MemoryEntry], query_tags: &[String]) -> Vec<ScoredHit> {
    if query_tags.is_empty() {
        return Vec::new();
    }

    entries
        .iter()
        .filter_map(|entry| {
            let common = entry
                .semantic_tags
                .iter()
                .filter(|tag| query_tags.contains(tag))
                .count();

            let denominator = entry.semantic_tags.len().max(query_tags.len()).max(1);
            let relevance = common as f64 / denominator as f64;

            (relevance > 0.0).then(|| ScoredHit {
                id: entry.id.clone(),
                relevance,
                search_type: SearchType::Semantic,
            })
        })
        .collect()
}

/// Pattern pass: overlap between the query's pattern candidates and the
/// entry's stored candidates.
pub fn search_by_patterns(
    entries: &[MemoryEntry],
    query_patterns: &[PatternCandidate],
) -> Vec<ScoredHit> {
    if query_patterns.is_empty() {
        return Vec::new();
    }

    entries
        .iter()
        .filter_map(|entry| {
            let common = entry
                .extracted_patterns
                .iter()
                .filter(|p| {
                    query_patterns
                        .iter()
                        .any(|q| q.kind == p.kind && q.key == p.key)
                })
                .count();

            let denominator = entry
                .extracted_patterns
                .len()
                .max(query_patterns.len())
                .max(1);
            let relevance = common as f64 / denominator as f64;

            (relevance > 0.0).then(|| ScoredHit {
                id: entry.id.clone(),
                relevance,
                search_type: SearchType::Pattern,
            })
        })
        .collect()
}

/// Context pass: signature similarity with a higher qualifying threshold,
/// reflecting that context similarity alone is a weak but precise signal.
pub fn search_by_context(
    entries: &[MemoryEntry],
    query_signature: &ContextSignature,
    threshold: f64,
) -> Vec<ScoredHit> {
    entries
        .iter()
        .filter_map(|entry| {
            let similarity = query_signature.similarity(&entry.context_signature);
            (similarity > threshold).then(|| ScoredHit {
                id: entry.id.clone(),
                relevance: similarity,
                search_type: SearchType::Context,
            })
        })
        .collect()
}

/// Temporal pass: exponential recency decay (or an age ramp when old
/// entries are preferred) plus a capped access-count boost.
pub fn search_by_temporal(
    entries: &[MemoryEntry],
    preference: Recency,
    decay_factor: f64,
    now: DateTime<Utc>,
) -> Vec<ScoredHit> {
    entries
        .iter()
        .filter_map(|entry| {
            let age_days = (now - entry.timestamp).num_seconds() as f64 / 86_400.0;

            let mut score = match preference {
                Recency::Recent => (-age_days.max(0.0) * decay_factor).exp(),
                Recency::Old => (age_days / 30.0).min(1.0),
                Recency::Any => 1.0,
            };

            let access_boost = (entry.access_count as f64 / 10.0).min(1.0);
            score += access_boost * 0.2;

            let relevance = score.min(1.0);
            (relevance > 0.1).then(|| ScoredHit {
                id: entry.id.clone(),
                relevance,
                search_type: SearchType::Temporal,
            })
        })
        .collect()
}

/// Deduplicate hits by entry id; the first (owning) pass wins per id.
pub fn deduplicate(hits: Vec<ScoredHit>) -> Vec<ScoredHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.id.clone()))
        .collect()
}

/// Final ranking: multiply each hit's relevance by its pass weight and an
/// access-count boost, drop results under the relevance threshold, sort
/// descending, and truncate to the result cap.
pub fn rank(
    hits: Vec<ScoredHit>,
    entries: &[MemoryEntry],
    config: &RetrievalConfig,
) -> Vec<RankedHit> {
    let access: HashMap<&str, u64> = entries
        .iter()
        .map(|e| (e.id.as_str(), e.access_count))
        .collect();

    let mut ranked: Vec<RankedHit> = hits
        .into_iter()
        .map(|hit| {
            let weight = match hit.search_type {
                SearchType::Semantic => config.weights.semantic,
                SearchType::Pattern => config.weights.pattern,
                SearchType::Content => config.weights.content,
                SearchType::Context => config.weights.context,
                SearchType::Temporal => config.weights.temporal,
            };

            let access_count = access.get(hit.id.as_str()).copied().unwrap_or(0);
            let boost = 1.0 + (access_count as f64 / 20.0).min(0.5);

            RankedHit {
                id: hit.id,
                relevance: (hit.relevance * weight * boost).min(1.0),
                search_type: hit.search_type,
            }
        })
        .filter(|hit| hit.relevance >= config.relevance_threshold)
        .collect();

    ranked.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(config.max_results);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::entry::build_entry;
    use sdk::agent::AgentContext;
    use serde_json::json;

    fn sample_entries() -> Vec<MemoryEntry> {
        let domains = vec!["api".to_string()];
        vec![
            build_entry(
                &json!({"success": true, "summary": "authentication flow verified"}),
                &AgentContext::for_file("src/api/auth.rs", "fn login() {}", "staged"),
                &domains,
            ),
            build_entry(
                &json!({"success": false, "error": "unresolved import"}),
                &AgentContext::for_file("src/web/view.ts", "import x", "manual"),
                &domains,
            ),
        ]
    }

    #[test]
    fn test_extract_search_terms_filters_short() {
        let terms = extract_search_terms("an odd Authentication error!");
        assert!(terms.contains(&"authentication".to_string()));
        assert!(terms.contains(&"error".to_string()));
        assert!(terms.contains(&"odd".to_string()));
        assert!(!terms.iter().any(|t| t == "an"));
    }

    #[test]
    fn test_content_search_finds_verbatim_term() {
        let entries = sample_entries();
        let terms = extract_search_terms("authentication");
        let hits = search_by_content(&entries, &terms);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, entries[0].id);
        assert!(hits[0].relevance > 0.0);
    }

    #[test]
    fn test_semantic_search_overlap() {
        let entries = sample_entries();
        let hits = search_by_semantic(&entries, &["status:error".to_string()]);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, entries[1].id);
    }

    #[test]
    fn test_context_threshold_excludes_weak_matches() {
        let entries = sample_entries();
        let query = ContextSignature {
            file_type: Some("py".into()),
            domain: "cli".into(),
            change_type: Some("none".into()),
            has_workflow: true,
        };

        // Nothing shares more than the qualifying fraction of fields
        let hits = search_by_context(&entries, &query, 0.3);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_temporal_recent_scores_high() {
        let entries = sample_entries();
        let hits = search_by_temporal(&entries, Recency::Recent, 0.1, Utc::now());

        assert_eq!(hits.len(), entries.len());
        for hit in hits {
            assert!(hit.relevance > 0.9);
        }
    }

    #[test]
    fn test_deduplicate_first_wins() {
        let hits = vec![
            ScoredHit {
                id: "a".into(),
                relevance: 0.9,
                search_type: SearchType::Content,
            },
            ScoredHit {
                id: "a".into(),
                relevance: 0.5,
                search_type: SearchType::Temporal,
            },
            ScoredHit {
                id: "b".into(),
                relevance: 0.4,
                search_type: SearchType::Semantic,
            },
        ];

        let unique = deduplicate(hits);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].search_type, SearchType::Content);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let entries = sample_entries();
        let hits = vec![
            ScoredHit {
                id: entries[0].id.clone(),
                relevance: 0.6,
                search_type: SearchType::Semantic,
            },
            ScoredHit {
                id: entries[1].id.clone(),
                relevance: 0.55,
                search_type: SearchType::Temporal,
            },
        ];

        let mut config = RetrievalConfig::default();
        config.max_results = 1;

        let ranked = rank(hits, &entries, &config);
        assert_eq!(ranked.len(), 1);
        // Semantic weight lifts the first hit above the temporal one
        assert_eq!(ranked[0].id, entries[0].id);
    }

    #[test]
    fn test_rank_drops_below_threshold() {
        let entries = sample_entries();
        let hits = vec![ScoredHit {
            id: entries[0].id.clone(),
            relevance: 0.1,
            search_type: SearchType::Content,
        }];

        let ranked = rank(hits, &entries, &RetrievalConfig::default());
        assert!(ranked.is_empty());
    }
}
