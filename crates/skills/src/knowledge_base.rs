//! Concept knowledge base.
//!
//! A small in-memory table of predefined concepts. Lookups that find
//! nothing return a not-found output, never an error.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use study_agent_core::{
    traits::Tool,
    types::{tool_names, ToolOutput},
    Result, ToolError,
};

/// Minimum length of a query word considered in partial matching.
const MIN_WORD_LEN: usize = 3;

/// One knowledge base entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub concept: String,
    pub definition: String,
    pub key_concepts: Vec<String>,
    pub examples: Vec<String>,
}

impl KnowledgeEntry {
    /// Text block folded into specialist prompts.
    pub fn render(&self) -> String {
        let mut out = format!("{}: {}", self.concept, self.definition);
        if !self.key_concepts.is_empty() {
            out.push_str(&format!("\nKey concepts: {}", self.key_concepts.join(", ")));
        }
        if !self.examples.is_empty() {
            out.push_str(&format!("\nExamples: {}", self.examples.join(", ")));
        }
        out
    }
}

/// Keyword-indexed concept store.
pub struct KnowledgeBase {
    entries: DashMap<String, KnowledgeEntry>,
}

impl KnowledgeBase {
    /// Empty knowledge base.
    pub fn empty() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Knowledge base seeded with the built-in concepts.
    pub fn with_defaults() -> Self {
        let kb = Self::empty();
        kb.add(
            "multi-agent system",
            "A system composed of multiple interacting agents that work together to solve problems",
            &["agents", "coordination", "communication", "distributed problem solving"],
            &["Router pattern", "Planner-executor pattern", "Supervisor pattern"],
        );
        kb.add(
            "langgraph",
            "A library for building stateful, multi-actor applications with LLMs",
            &["state graph", "nodes", "edges", "conditional routing"],
            &["Multi-agent workflows", "Agentic applications"],
        );
        kb.add(
            "langchain",
            "A framework for developing applications powered by language models",
            &["chains", "agents", "tools", "memory", "prompts"],
            &["RAG systems", "Agent workflows", "Tool calling"],
        );
        kb
    }

    /// Add or replace a concept. Keys are case-insensitive.
    pub fn add(&self, concept: &str, definition: &str, key_concepts: &[&str], examples: &[&str]) {
        let key = concept.trim().to_lowercase();
        self.entries.insert(
            key.clone(),
            KnowledgeEntry {
                concept: key,
                definition: definition.to_string(),
                key_concepts: key_concepts.iter().map(|s| s.to_string()).collect(),
                examples: examples.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a concept mentioned in `query`.
    ///
    /// First pass: the key occurs in the query, or the query in the key.
    /// Second pass: any query word occurs in the key. Keys are visited in
    /// sorted order so results are deterministic.
    pub fn search(&self, query: &str) -> Option<KnowledgeEntry> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();

        let direct = keys
            .iter()
            .find(|key| {
                query.contains(key.as_str())
                    || (query.len() >= MIN_WORD_LEN && key.contains(query.as_str()))
            });

        let found = direct.or_else(|| {
            let words: Vec<&str> = query
                .split(|c: char| !c.is_alphanumeric() && c != '-')
                .filter(|w| w.len() >= MIN_WORD_LEN)
                .collect();
            keys.iter().find(|key| words.iter().any(|w| key.contains(w)))
        })?;

        self.entries.get(found).map(|e| e.value().clone())
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Knowledge base tool: `{"query": "..."}` → entry or not-found.
pub struct KnowledgeBaseTool {
    kb: KnowledgeBase,
}

impl KnowledgeBaseTool {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self { kb }
    }
}

impl Default for KnowledgeBaseTool {
    fn default() -> Self {
        Self::new(KnowledgeBase::with_defaults())
    }
}

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn name(&self) -> &str {
        tool_names::KNOWLEDGE_BASE
    }

    fn description(&self) -> &str {
        "Look up the definition, key concepts and examples of a known concept"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Concept or question mentioning the concept"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("query is required".into()))?;

        match self.kb.search(query) {
            Some(entry) => {
                tracing::debug!(concept = %entry.concept, "Knowledge base hit");
                Ok(ToolOutput::text(entry.render()).with_data(serde_json::to_value(&entry)?))
            }
            None => {
                tracing::debug!(query = %query, "Knowledge base miss");
                Ok(ToolOutput::not_found(format!("No entry found for '{}'", query)))
            }
        }
    }
}
