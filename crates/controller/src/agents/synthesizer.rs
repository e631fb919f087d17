//! Synthesizer node: composes the final answer and writes session memory.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use study_agent_core::types::{
    CodeHelp, Confidence, FinalResponse, QueryCategory, SpecialistOutput, StudyPlan,
    TheoryExplanation, UserProfile, WorkflowState,
};
use study_agent_model_gateway::StructuredCaller;
use study_agent_store::MemoryStore;

use super::prompts::{self, render_messages, vars};

/// Answer used when there is nothing to compose and the model cannot help.
pub const FALLBACK_ANSWER: &str = "I'm here to help! Could you provide more details?";

/// Known language names and how they are stored in the profile.
const LANGUAGES: &[(&str, &str)] = &[
    ("python", "Python"),
    ("rust", "Rust"),
    ("javascript", "JavaScript"),
    ("typescript", "TypeScript"),
    ("java", "Java"),
    ("golang", "Go"),
    ("c++", "C++"),
    ("c#", "C#"),
    ("ruby", "Ruby"),
    ("kotlin", "Kotlin"),
    ("swift", "Swift"),
    ("sql", "SQL"),
    ("haskell", "Haskell"),
    ("scala", "Scala"),
    ("php", "PHP"),
];

/// Turns the populated state into a [`FinalResponse`].
pub struct SynthesizerAgent {
    caller: StructuredCaller,
    store: Arc<MemoryStore>,
    temperature: f32,
}

impl SynthesizerAgent {
    pub fn new(caller: StructuredCaller, store: Arc<MemoryStore>, temperature: f32) -> Self {
        Self {
            caller,
            store,
            temperature,
        }
    }

    /// Compose the answer. Never fails.
    pub async fn synthesize(&self, state: &WorkflowState) -> FinalResponse {
        let mut metadata = BTreeMap::new();
        if let Some(routing) = state.routing_decision() {
            metadata.insert("category".to_string(), json!(routing.query_type));
            metadata.insert("priority".to_string(), json!(routing.priority));
            metadata.insert("rationale".to_string(), json!(routing.reasoning));
        }

        let answer = match state.specialist() {
            Some(SpecialistOutput::Theory(t)) => {
                metadata.insert("difficulty_level".to_string(), json!(t.difficulty_level));
                render_theory(t)
            }
            Some(SpecialistOutput::Code(c)) => render_code(c),
            Some(SpecialistOutput::Plan(p)) => render_plan(p),
            None => {
                let (answer, fallback) = self.answer_directly(state).await;
                if fallback {
                    metadata.insert("fallback".to_string(), Value::Bool(true));
                }
                answer
            }
        };

        let notes = state
            .specialist()
            .map(|s| s.tool_notes().to_vec())
            .unwrap_or_default();
        let answer = if notes.is_empty() {
            answer
        } else {
            metadata.insert("tool_notes".to_string(), json!(notes));
            format!("{}\n\n**Notes:**\n{}", answer.trim_end(), bullets(&notes))
        };

        let confidence = confidence(state);
        tracing::info!(
            answer_len = answer.len(),
            confidence = confidence.as_str(),
            "Response synthesized"
        );

        FinalResponse {
            answer,
            agents_involved: state.agent_names(),
            tools_used: state.tools_used().to_vec(),
            memory_accessed: state.memory_accessed(),
            confidence,
            metadata,
        }
    }

    /// Record the interaction and profile signals. Store failures are logged only.
    pub async fn remember(&self, state: &WorkflowState, response: &FinalResponse) {
        if let Err(e) = self
            .store
            .record_interaction(state.request(), &response.answer, response.agents_involved.clone())
            .await
        {
            tracing::warn!(error = %e, "Failed to record interaction");
        }

        let signals = profile_signals(state);
        if signals.is_empty() {
            return;
        }
        match self.store.update_profile(&signals).await {
            Ok(changed) => tracing::debug!(changed, "Profile signals merged"),
            Err(e) => tracing::warn!(error = %e, "Failed to update profile"),
        }
    }

    /// General and memory requests: one free-text call grounded in memory context.
    async fn answer_directly(&self, state: &WorkflowState) -> (String, bool) {
        let messages = match render_messages(
            prompts::SYNTHESIZER_SYSTEM,
            prompts::SYNTHESIZER_USER,
            &vars([
                ("query", state.request()),
                ("memory_context", state.memory_context()),
            ]),
        ) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to render synthesizer prompt");
                return (FALLBACK_ANSWER.to_string(), true);
            }
        };

        match self.caller.text(&messages, self.temperature).await {
            Ok(text) if !text.trim().is_empty() => (text.trim().to_string(), false),
            Ok(_) => {
                tracing::warn!("Model returned an empty answer; using fallback");
                (FALLBACK_ANSWER.to_string(), true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Direct answer failed; using fallback");
                (FALLBACK_ANSWER.to_string(), true)
            }
        }
    }
}

/// Low with any tool note, high when memory and a specialist both contributed.
fn confidence(state: &WorkflowState) -> Confidence {
    let has_notes = state
        .specialist()
        .is_some_and(|s| !s.tool_notes().is_empty());
    let memory_contributed = !state.memory_context().trim().is_empty();

    if has_notes {
        Confidence::Low
    } else if memory_contributed && state.specialist().is_some() {
        Confidence::High
    } else {
        Confidence::Medium
    }
}

fn profile_signals(state: &WorkflowState) -> UserProfile {
    let mut signals = UserProfile::default();

    if let Some(t) = state.theory_explanation() {
        signals.add_topic(&t.concept);
    } else if let Some(routing) = state.routing_decision() {
        if routing.query_type != QueryCategory::General {
            signals.add_topic(routing.query_type.as_str());
        }
    }

    for language in detect_languages(state.request()) {
        signals.add_language(language);
    }
    if let Some(lang) = state.code_help().and_then(|c| c.language.as_deref()) {
        signals.add_language(canonical_language(lang));
    }

    if let Some(p) = state.study_plan() {
        signals.add_goal(&p.goal);
    }
    signals
}

fn canonical_language(name: &str) -> &str {
    let lower = name.trim().to_lowercase();
    LANGUAGES
        .iter()
        .find(|(key, _)| *key == lower || (lower == "go" && *key == "golang"))
        .map(|(_, display)| *display)
        .unwrap_or_else(|| name.trim())
}

/// Language names mentioned as whole words in `text`.
fn detect_languages(text: &str) -> Vec<&'static str> {
    let words: Vec<String> = text
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .map(|w| w.to_lowercase())
        .collect();
    LANGUAGES
        .iter()
        .filter(|(key, _)| words.iter().any(|w| w == key))
        .map(|(_, display)| *display)
        .collect()
}

// =============================================================================
// Markdown rendering
// =============================================================================

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

fn section(out: &mut String, title: &str, items: &[String]) {
    if !items.is_empty() {
        let _ = write!(out, "\n\n**{}:**\n{}", title, bullets(items));
    }
}

fn render_theory(t: &TheoryExplanation) -> String {
    let mut out = format!("## Explanation: {}\n\n{}", t.concept, t.explanation.trim());
    section(&mut out, "Key Points", &t.key_points);
    section(&mut out, "Examples", &t.examples);
    if !t.related_concepts.is_empty() {
        let _ = write!(out, "\n\n**Related Concepts:** {}", t.related_concepts.join(", "));
    }
    out
}

fn render_code(c: &CodeHelp) -> String {
    let mut out = format!(
        "## Code Help\n\n**Problem:** {}\n\n**Approach:** {}",
        c.problem_description.trim(),
        c.solution_approach.trim()
    );
    if let Some(code) = c.code_example.as_deref().filter(|s| !s.trim().is_empty()) {
        let lang = c.language.as_deref().unwrap_or("python").to_lowercase();
        let _ = write!(out, "\n\n**Code Example:**\n```{}\n{}\n```", lang, code.trim_end());
    }
    if !c.explanation.trim().is_empty() {
        let _ = write!(out, "\n\n{}", c.explanation.trim());
    }
    if let Some(output) = &c.execution_output {
        let _ = write!(out, "\n\n**Execution Output:**\n```\n{}\n```", output.trim_end());
    }
    section(&mut out, "Best Practices", &c.best_practices);
    section(&mut out, "Common Pitfalls", &c.common_pitfalls);
    out
}

fn render_plan(p: &StudyPlan) -> String {
    let mut out = format!("## Study Plan: {}\n", p.goal);
    for (i, step) in p.steps.iter().enumerate() {
        let _ = write!(
            out,
            "\n**Step {}:** {} - {}\n   Estimated time: {}\n",
            i + 1,
            step.step,
            step.description,
            step.estimated_time
        );
    }
    let _ = write!(out, "\n**Total estimated time:** {}", p.total_estimated_time);
    if let Some(schedule) = &p.schedule {
        let _ = write!(out, "\n\n**Schedule:**\n```\n{}\n```", schedule);
    }
    section(&mut out, "Priority Order", &p.priority_order);
    section(&mut out, "Resources", &p.resources);
    section(&mut out, "Milestones", &p.milestones);
    out
}
