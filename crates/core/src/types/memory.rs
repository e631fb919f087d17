use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One completed request as stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    /// Response excerpt (truncated on insert).
    pub response: String,
    #[serde(default)]
    pub agents: Vec<String>,
}

impl InteractionRecord {
    pub fn new(query: impl Into<String>, response: impl Into<String>, agents: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            query: query.into(),
            response: response.into(),
            agents,
        }
    }
}

/// Long-lived user signals. Each list behaves as an insertion-ordered set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
}

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty() && self.languages.is_empty() && self.goals.is_empty()
    }

    pub fn add_topic(&mut self, topic: &str) -> bool {
        insert_unique(&mut self.topics, topic)
    }

    pub fn add_language(&mut self, language: &str) -> bool {
        insert_unique(&mut self.languages, language)
    }

    pub fn add_goal(&mut self, goal: &str) -> bool {
        insert_unique(&mut self.goals, goal)
    }

    /// Merge another profile into this one. Returns true if anything changed.
    pub fn merge(&mut self, other: &UserProfile) -> bool {
        let mut changed = false;
        for t in &other.topics {
            changed |= self.add_topic(t);
        }
        for l in &other.languages {
            changed |= self.add_language(l);
        }
        for g in &other.goals {
            changed |= self.add_goal(g);
        }
        changed
    }

    /// One-line rendering used in memory context, e.g. `Profile: topics=rag; goals=learn rust`.
    pub fn summary_line(&self) -> Option<String> {
        let mut parts = Vec::new();
        if !self.topics.is_empty() {
            parts.push(format!("topics={}", self.topics.join(", ")));
        }
        if !self.languages.is_empty() {
            parts.push(format!("languages={}", self.languages.join(", ")));
        }
        if !self.goals.is_empty() {
            parts.push(format!("goals={}", self.goals.join(", ")));
        }
        if parts.is_empty() {
            None
        } else {
            Some(format!("Profile: {}", parts.join("; ")))
        }
    }
}

fn insert_unique(list: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || list.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        return false;
    }
    list.push(value.to_string());
    true
}

/// Persisted memory file layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryDocument {
    #[serde(default)]
    pub history: Vec<InteractionRecord>,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

/// A history entry paired with its keyword-overlap score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredInteraction {
    pub record: InteractionRecord,
    pub score: usize,
}
