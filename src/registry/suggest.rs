// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Fuzzy "did you mean" ranking for unknown operation names

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use similar::TextDiff;

/// Suggestion settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Minimum similarity ratio, 0.0 to 1.0
    pub cutoff: f64,
    /// Maximum number of suggestions
    pub limit: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            cutoff: 0.6,
            limit: 3,
        }
    }
}

/// Similarity of two names: `2 * matching / total` characters
pub fn similarity(a: &str, b: &str) -> f64 {
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Rank registered names against `query`
///
/// `candidates` yields `(name, canonical)` pairs covering canonical names
/// and aliases. An alias match counts for its canonical name, each
/// canonical name appears once with its best score, and ties sort
/// alphabetically.
pub fn rank<'a>(
    query: &str,
    candidates: impl IntoIterator<Item = (&'a str, &'a str)>,
    config: &SuggestionConfig,
) -> Vec<String> {
    let mut best: BTreeMap<&str, f64> = BTreeMap::new();
    for (name, canonical) in candidates {
        if canonical == query {
            continue;
        }
        let score = similarity(query, name);
        if score >= config.cutoff {
            let entry = best.entry(canonical).or_insert(score);
            if score > *entry {
                *entry = score;
            }
        }
    }

    let mut ranked: Vec<(&str, f64)> = best.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(config.limit)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &[(&str, &str)] = &[
        ("extract_field", "extract_field"),
        ("extract", "extract_field"),
        ("uppercase", "uppercase"),
        ("upper", "uppercase"),
        ("lowercase", "lowercase"),
        ("lower", "lowercase"),
    ];

    #[test]
    fn test_typo_finds_canonical_name() {
        let ranked = rank("extrct_field", NAMES.iter().copied(), &SuggestionConfig::default());
        assert_eq!(ranked, vec!["extract_field"]);
    }

    #[test]
    fn test_alias_match_dedupes_to_canonical() {
        let ranked = rank("uper", NAMES.iter().copied(), &SuggestionConfig::default());
        assert_eq!(ranked[0], "uppercase");
        assert_eq!(ranked.iter().filter(|n| *n == "uppercase").count(), 1);
    }

    #[test]
    fn test_limit_and_cutoff() {
        let config = SuggestionConfig {
            cutoff: 0.3,
            limit: 2,
        };
        assert_eq!(rank("case", NAMES.iter().copied(), &config).len(), 2);
        assert!(rank("zzzzzz", NAMES.iter().copied(), &SuggestionConfig::default()).is_empty());
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let first = rank("lowercas", NAMES.iter().copied(), &SuggestionConfig::default());
        let second = rank("lowercas", NAMES.iter().rev().copied(), &SuggestionConfig::default());
        assert_eq!(first, second);
        assert_eq!(first[0], "lowercase");
    }
}
