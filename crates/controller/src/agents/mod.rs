//! Agent nodes.
//!
//! Each node is a plain struct holding its collaborators. Nodes take typed
//! inputs and return typed outcomes; only the workflow engine writes to the
//! per-request state record.

pub mod code;
pub mod memory_manager;
pub mod planner;
pub mod prompts;
pub mod router;
pub mod synthesizer;
pub mod theory;

pub use code::CodeHelperAgent;
pub use memory_manager::MemoryManagerAgent;
pub use planner::PlannerAgent;
pub use router::RouterAgent;
pub use synthesizer::SynthesizerAgent;
pub use synthesizer::FALLBACK_ANSWER;
pub use theory::TheoryExplainerAgent;

use serde_json::{json, Value};
use std::sync::Arc;

use study_agent_core::{
    traits::ToolRegistry,
    types::{tool_names, ToolOutput},
};
use study_agent_skills::extract_expression;

/// Output of a specialist plus the tools that contributed to it.
#[derive(Debug, Clone)]
pub struct NodeOutcome<T> {
    pub output: T,
    pub tools_used: Vec<String>,
}

/// Tool access for one specialist run.
///
/// Tool failures never propagate: they become notes. A tool that is not
/// registered is skipped silently.
pub(crate) struct ToolSession {
    registry: Arc<dyn ToolRegistry>,
    pub(crate) used: Vec<String>,
    pub(crate) notes: Vec<String>,
}

impl ToolSession {
    pub(crate) fn new(registry: Arc<dyn ToolRegistry>) -> Self {
        Self {
            registry,
            used: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Run `name` with `args`. Returns the output only when the tool produced a result.
    pub(crate) async fn run(&mut self, name: &str, args: Value) -> Option<ToolOutput> {
        if self.registry.get(name).await.is_none() {
            tracing::debug!(tool = %name, "Tool not registered; skipping");
            return None;
        }

        match self.registry.execute(name, args).await {
            Ok(output) if output.success => {
                tracing::info!(tool = %name, "Tool contributed");
                self.used.push(name.to_string());
                Some(output)
            }
            Ok(output) => {
                tracing::debug!(tool = %name, content = %output.content, "Tool found nothing");
                None
            }
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool failed; continuing without it");
                self.notes.push(format!("{}: {}", name, e));
                None
            }
        }
    }

    /// Evaluate an arithmetic expression embedded in `request`, if any.
    pub(crate) async fn calculate(&mut self, request: &str) -> Option<String> {
        let expression = extract_expression(request)?;
        self.run(tool_names::CALCULATOR, json!({ "expression": expression }))
            .await
            .map(|output| output.content)
    }

    pub(crate) fn finish<T>(self, output: T) -> NodeOutcome<T> {
        NodeOutcome {
            output,
            tools_used: self.used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_agent_core::{mocks::StaticTool, ToolError};
    use study_agent_skills::create_default_registry;

    #[tokio::test]
    async fn test_calculator_folds_result() {
        let registry = Arc::new(create_default_registry().await.unwrap());
        let mut session = ToolSession::new(registry);

        let result = session.calculate("How long is 3 * (4 + 2) hours?").await;

        assert_eq!(result.as_deref(), Some("3 * (4 + 2) = 18"));
        assert_eq!(session.used, vec![tool_names::CALCULATOR]);
        assert!(session.notes.is_empty());
    }

    #[tokio::test]
    async fn test_failure_becomes_note() {
        let registry = study_agent_skills::DefaultToolRegistry::new();
        registry
            .register(Arc::new(StaticTool::failing(
                tool_names::SCHEDULE,
                ToolError::UnparseableDuration("someday".into()),
            )))
            .await
            .unwrap();
        let mut session = ToolSession::new(Arc::new(registry));

        assert!(session.run(tool_names::SCHEDULE, json!({})).await.is_none());
        assert!(session.used.is_empty());
        assert_eq!(session.notes.len(), 1);
        assert!(session.notes[0].starts_with("schedule:"));
    }

    #[tokio::test]
    async fn test_unregistered_tool_is_skipped() {
        let registry = Arc::new(study_agent_skills::DefaultToolRegistry::new());
        let mut session = ToolSession::new(registry);

        assert!(session.run(tool_names::CODE_EXECUTOR, json!({"code": "print(1)"})).await.is_none());
        assert!(session.notes.is_empty());
    }
}
