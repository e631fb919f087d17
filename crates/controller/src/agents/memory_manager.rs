//! Memory manager node: keyword retrieval over session history.
//!
//! The context is the matched excerpts followed by the profile line; the
//! profile line appears whenever the profile is non-empty, matches or not.
//! Read-only. The synthesizer is the only node that writes to the store.

use std::sync::Arc;

use study_agent_core::types::{MemoryUpdate, ScoredInteraction};
use study_agent_store::{keyword, MemoryStore};

/// Retrieves earlier interactions relevant to a request.
pub struct MemoryManagerAgent {
    store: Arc<MemoryStore>,
    retrieval_limit: usize,
    min_overlap: usize,
}

impl MemoryManagerAgent {
    pub fn new(store: Arc<MemoryStore>, retrieval_limit: usize, min_overlap: usize) -> Self {
        Self {
            store,
            retrieval_limit,
            min_overlap,
        }
    }

    pub async fn retrieve(&self, request: &str) -> MemoryUpdate {
        let matches = self
            .store
            .search(request, self.min_overlap, self.retrieval_limit)
            .await;
        let profile = self.store.profile().await;

        let mut sections: Vec<String> = matches.iter().map(render_match).collect();
        if let Some(line) = profile.summary_line() {
            sections.push(line);
        }
        let retrieved_context = sections.join("\n\n");

        let reasoning = if matches.is_empty() {
            "No earlier interaction shares keywords with the request".to_string()
        } else {
            format!(
                "{} earlier interaction(s) share keywords with the request (best score {})",
                matches.len(),
                matches[0].score
            )
        };

        tracing::info!(
            matches = matches.len(),
            context_len = retrieved_context.len(),
            profile_empty = profile.is_empty(),
            "Memory retrieved"
        );

        let key = keyword::tokenize(request)
            .into_iter()
            .collect::<Vec<_>>()
            .join(" ");

        MemoryUpdate {
            action: "retrieve".to_string(),
            key,
            matches,
            retrieved_context,
            profile,
            reasoning,
        }
    }
}

fn render_match(m: &ScoredInteraction) -> String {
    format!("Q: {}\nA: {}", m.record.query, m.record.response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_agent_core::types::UserProfile;
    use study_agent_store::MemoryLimits;

    #[tokio::test]
    async fn test_retrieve_relevant_history_and_profile() {
        let store = Arc::new(MemoryStore::in_memory(MemoryLimits::default()));
        store
            .record_interaction("Explain borrow checking in Rust", "Ownership rules...", vec![])
            .await
            .unwrap();
        store
            .record_interaction("Best pasta recipe", "Boil water...", vec![])
            .await
            .unwrap();
        let mut signals = UserProfile::default();
        signals.add_goal("Learn Rust in 2 weeks");
        store.update_profile(&signals).await.unwrap();

        let agent = MemoryManagerAgent::new(store.clone(), 3, 1);
        let update = agent.retrieve("What did you say about Rust ownership?").await;

        assert_eq!(update.action, "retrieve");
        assert_eq!(update.matches.len(), 1);
        assert!(update.retrieved_context.contains("Q: Explain borrow checking in Rust"));
        assert!(update.retrieved_context.contains("goals=Learn Rust in 2 weeks"));
        assert!(!update.retrieved_context.contains("pasta"));
        assert_eq!(store.snapshot().await.history.len(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_empty_store() {
        let store = Arc::new(MemoryStore::in_memory(MemoryLimits::default()));
        let agent = MemoryManagerAgent::new(store, 3, 1);

        let update = agent.retrieve("What was my goal?").await;

        assert!(update.matches.is_empty());
        assert!(update.retrieved_context.is_empty());
        assert_eq!(update.key, "goal");
    }

    #[tokio::test]
    async fn test_profile_only_context_without_matches() {
        let store = Arc::new(MemoryStore::in_memory(MemoryLimits::default()));
        store
            .record_interaction("Best pasta recipe", "Boil water...", vec![])
            .await
            .unwrap();
        let mut signals = UserProfile::default();
        signals.add_goal("Learn Rust in 2 weeks");
        store.update_profile(&signals).await.unwrap();
        let agent = MemoryManagerAgent::new(store, 3, 1);

        let update = agent.retrieve("What was my goal?").await;

        assert!(update.matches.is_empty());
        assert_eq!(update.retrieved_context, "Profile: goals=Learn Rust in 2 weeks");
    }
}
