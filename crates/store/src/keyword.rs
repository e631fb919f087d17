//! Keyword overlap retrieval.
//!
//! Tokens are lowercase alphanumeric runs of at least three characters,
//! minus a small English stop-word list. A history entry scores the number
//! of distinct request tokens that also occur in its query or response.

use std::collections::BTreeSet;

use study_agent_core::types::{InteractionRecord, ScoredInteraction};

const MIN_TOKEN_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    "about", "again", "all", "also", "and", "any", "are", "been", "before", "but", "can", "could",
    "did", "does", "earlier", "for", "from", "had", "has", "have", "her", "his", "how", "into",
    "its", "just", "let", "like", "may", "more", "most", "not", "now", "one", "our", "out",
    "please", "previous", "should", "some", "such", "tell", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "those", "very", "was", "were", "what",
    "when", "where", "which", "who", "why", "will", "with", "would", "you", "your",
];

/// Distinct significant tokens of `text`.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Number of distinct `query_tokens` found in the record's query or response.
pub fn score(query_tokens: &BTreeSet<String>, record: &InteractionRecord) -> usize {
    if query_tokens.is_empty() {
        return 0;
    }
    let mut record_tokens = tokenize(&record.query);
    record_tokens.extend(tokenize(&record.response));
    query_tokens.intersection(&record_tokens).count()
}

/// Rank `history` (oldest first) against `query`.
///
/// Keeps entries scoring at least `min_overlap`, orders by score then
/// recency, and returns at most `limit`.
pub fn rank(
    history: &[InteractionRecord],
    query: &str,
    min_overlap: usize,
    limit: usize,
) -> Vec<ScoredInteraction> {
    let tokens = tokenize(query);
    let min_overlap = min_overlap.max(1);

    let mut scored: Vec<(usize, usize)> = history
        .iter()
        .enumerate()
        .map(|(idx, record)| (idx, score(&tokens, record)))
        .filter(|(_, s)| *s >= min_overlap)
        .collect();

    // Higher score first; among equals the newer (higher index) first.
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

    scored
        .into_iter()
        .take(limit)
        .map(|(idx, score)| ScoredInteraction {
            record: history[idx].clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(query: &str, response: &str) -> InteractionRecord {
        InteractionRecord::new(query, response, vec!["router".into()])
    }

    #[test]
    fn test_tokenize_filters_short_and_stop_words() {
        let tokens = tokenize("What is the Rust borrow-checker? It's a compile-time tool.");
        assert!(tokens.contains("rust"));
        assert!(tokens.contains("borrow"));
        assert!(tokens.contains("checker"));
        assert!(tokens.contains("compile"));
        assert!(!tokens.contains("what"));
        assert!(!tokens.contains("is"));
        assert!(!tokens.contains("the"));
    }

    #[test]
    fn test_rank_orders_by_score_then_recency() {
        let history = vec![
            record("learn rust ownership", "ownership rules"),
            record("python lists", "sorting lists in python"),
            record("rust traits", "traits are interfaces"),
            record("rust ownership and lifetimes", "lifetimes annotate borrows"),
        ];

        let ranked = rank(&history, "How does rust ownership work?", 1, 3);

        assert_eq!(ranked.len(), 3);
        // Two entries score 2; the newer one wins the tie.
        assert_eq!(ranked[0].record.query, "rust ownership and lifetimes");
        assert_eq!(ranked[0].score, 2);
        assert_eq!(ranked[1].record.query, "learn rust ownership");
        assert_eq!(ranked[2].record.query, "rust traits");
    }

    #[test]
    fn test_rank_respects_min_overlap_and_empty_query() {
        let history = vec![record("python lists", "sorting")];
        assert!(rank(&history, "rust ownership", 1, 3).is_empty());
        assert!(rank(&history, "is it?", 1, 3).is_empty());
        assert_eq!(rank(&history, "python sorting", 2, 3).len(), 1);
        assert!(rank(&history, "python", 2, 3).is_empty());
    }
}
