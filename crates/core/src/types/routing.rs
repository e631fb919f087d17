use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::StructuredOutput;

// =============================================================================
// Routing Types (Router Output)
// =============================================================================

/// Query category decided by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueryCategory {
    Theory,
    Code,
    Planning,
    Memory,
    General,
}

impl QueryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Theory => "theory",
            Self::Code => "code",
            Self::Planning => "planning",
            Self::Memory => "memory",
            Self::General => "general",
        }
    }

    /// The specialist that handles this category, if any.
    pub fn specialist(&self) -> Option<AgentId> {
        match self {
            Self::Theory => Some(AgentId::TheoryExplainer),
            Self::Code => Some(AgentId::CodeHelper),
            Self::Planning => Some(AgentId::Planner),
            Self::Memory | Self::General => None,
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of an agent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    Router,
    MemoryManager,
    TheoryExplainer,
    CodeHelper,
    Planner,
    Synthesizer,
}

impl AgentId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::MemoryManager => "memory_manager",
            Self::TheoryExplainer => "theory_explainer",
            Self::CodeHelper => "code_helper",
            Self::Planner => "planner",
            Self::Synthesizer => "synthesizer",
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Router agent output: which category the request belongs to and what it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoutingDecision {
    /// Category of the query.
    pub query_type: QueryCategory,
    /// Agent identifiers suggested for the query (theory_explainer, code_helper, planner, memory_manager).
    #[serde(default)]
    pub target_agents: Vec<String>,
    /// Why this routing was chosen.
    pub reasoning: String,
    /// Priority level (1 = high, 2 = medium, 3 = low).
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Whether previous session context should be retrieved.
    #[serde(default)]
    pub needs_memory: bool,
    /// Whether tools (calculator, code executor, schedule, knowledge base) may be needed.
    #[serde(default)]
    pub needs_tools: bool,
}

fn default_priority() -> u8 {
    1
}

impl StructuredOutput for RoutingDecision {
    const SCHEMA_NAME: &'static str = "RoutingDecision";

    fn validate(&self) -> Result<(), String> {
        if !(1..=3).contains(&self.priority) {
            return Err(format!("priority must be 1, 2 or 3 (got {})", self.priority));
        }
        if self.reasoning.trim().is_empty() {
            return Err("reasoning must not be empty".to_string());
        }
        Ok(())
    }
}
