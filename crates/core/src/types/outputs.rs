use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::schema::StructuredOutput;
use crate::types::ScoredInteraction;
use crate::types::UserProfile;

// =============================================================================
// Theory Explainer
// =============================================================================

/// Difficulty level of an explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

/// Structured explanation of a theoretical concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TheoryExplanation {
    /// The concept being explained.
    pub concept: String,
    /// Detailed explanation.
    pub explanation: String,
    /// Key points to remember (at least one).
    pub key_points: Vec<String>,
    /// Practical examples.
    #[serde(default)]
    pub examples: Vec<String>,
    /// Related concepts worth exploring next.
    #[serde(default)]
    pub related_concepts: Vec<String>,
    /// Difficulty: beginner, intermediate or advanced.
    #[serde(default)]
    pub difficulty_level: Difficulty,
    #[serde(default, skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    #[schemars(skip)]
    pub tool_notes: Vec<String>,
}

impl StructuredOutput for TheoryExplanation {
    const SCHEMA_NAME: &'static str = "TheoryExplanation";

    fn validate(&self) -> Result<(), String> {
        if self.concept.trim().is_empty() {
            return Err("concept must not be empty".to_string());
        }
        if self.explanation.trim().is_empty() {
            return Err("explanation must not be empty".to_string());
        }
        if self.key_points.is_empty() {
            return Err("key_points must contain at least one entry".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Code Helper
// =============================================================================

/// Structured programming help.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CodeHelp {
    /// Restatement of the coding problem.
    pub problem_description: String,
    /// How to approach the solution.
    pub solution_approach: String,
    /// Example code, if relevant.
    #[serde(default)]
    pub code_example: Option<String>,
    /// Language of the example (e.g. "python").
    #[serde(default)]
    pub language: Option<String>,
    /// Explanation of the code.
    pub explanation: String,
    /// Best practices to follow.
    #[serde(default)]
    pub best_practices: Vec<String>,
    /// Common mistakes to avoid.
    #[serde(default)]
    pub common_pitfalls: Vec<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub execution_output: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    #[schemars(skip)]
    pub tool_notes: Vec<String>,
}

impl CodeHelp {
    /// Whether the example can be handed to the Python executor.
    pub fn is_python(&self) -> bool {
        match self.language.as_deref() {
            None => true,
            Some(lang) => {
                let lang = lang.trim().to_lowercase();
                lang.is_empty() || lang == "python" || lang == "python3" || lang == "py"
            }
        }
    }
}

impl StructuredOutput for CodeHelp {
    const SCHEMA_NAME: &'static str = "CodeHelp";

    fn validate(&self) -> Result<(), String> {
        if self.problem_description.trim().is_empty() {
            return Err("problem_description must not be empty".to_string());
        }
        if self.solution_approach.trim().is_empty() {
            return Err("solution_approach must not be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Planner
// =============================================================================

/// A single step of a study plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    /// Short title of the step.
    pub step: String,
    /// What to do in this step.
    pub description: String,
    /// Time estimate, e.g. "3 days" or "90 minutes".
    pub estimated_time: String,
}

/// Structured study plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StudyPlan {
    /// The learning goal.
    pub goal: String,
    /// Ordered steps (at least one).
    pub steps: Vec<PlanStep>,
    /// Total time estimate, e.g. "2 weeks".
    pub total_estimated_time: String,
    /// Priority order of topics.
    #[serde(default)]
    pub priority_order: Vec<String>,
    /// Learning resources.
    #[serde(default)]
    pub resources: Vec<String>,
    /// Milestones to track progress.
    #[serde(default)]
    pub milestones: Vec<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub schedule: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    #[schemars(skip)]
    pub tool_notes: Vec<String>,
}

impl StructuredOutput for StudyPlan {
    const SCHEMA_NAME: &'static str = "StudyPlan";

    fn validate(&self) -> Result<(), String> {
        if self.goal.trim().is_empty() {
            return Err("goal must not be empty".to_string());
        }
        if self.steps.is_empty() {
            return Err("steps must contain at least one entry".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Memory Manager
// =============================================================================

/// Result of a memory retrieval.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryUpdate {
    /// Always "retrieve"; the memory manager never writes.
    pub action: String,
    /// Lookup key (the normalized request tokens).
    pub key: String,
    /// History entries that matched, best first.
    pub matches: Vec<ScoredInteraction>,
    /// Concatenated context handed to downstream nodes.
    pub retrieved_context: String,
    /// Profile snapshot at retrieval time.
    pub profile: UserProfile,
    /// Why these entries were chosen.
    pub reasoning: String,
}

// =============================================================================
// Final Response
// =============================================================================

/// Confidence of the final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Terminal answer assembled by the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResponse {
    pub answer: String,
    pub agents_involved: Vec<String>,
    pub tools_used: Vec<String>,
    pub memory_accessed: bool,
    pub confidence: Confidence,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}
