//! Theory explainer node.

use serde_json::json;
use std::sync::Arc;

use study_agent_core::{
    format_instructions,
    traits::ToolRegistry,
    types::{tool_names, TheoryExplanation},
    Result,
};
use study_agent_model_gateway::StructuredCaller;

use super::prompts::{self, render_messages, vars};
use super::{NodeOutcome, ToolSession};

/// Explains concepts, consulting the knowledge base first.
pub struct TheoryExplainerAgent {
    caller: StructuredCaller,
    tools: Arc<dyn ToolRegistry>,
    temperature: f32,
}

impl TheoryExplainerAgent {
    pub fn new(caller: StructuredCaller, tools: Arc<dyn ToolRegistry>, temperature: f32) -> Self {
        Self {
            caller,
            tools,
            temperature,
        }
    }

    pub async fn explain(
        &self,
        request: &str,
        memory_context: &str,
    ) -> Result<NodeOutcome<TheoryExplanation>> {
        let mut session = ToolSession::new(self.tools.clone());
        let mut tool_context = Vec::new();

        if let Some(result) = session.calculate(request).await {
            tool_context.push(format!("Calculator: {}", result));
        }
        if let Some(entry) = session
            .run(tool_names::KNOWLEDGE_BASE, json!({ "query": request }))
            .await
        {
            tool_context.push(format!("Knowledge base entry:\n{}", entry.content));
        }

        let instructions = format_instructions::<TheoryExplanation>();
        let tool_context = tool_context.join("\n\n");
        let messages = render_messages(
            prompts::THEORY_SYSTEM,
            prompts::SPECIALIST_USER,
            &vars([
                ("format_instructions", instructions.as_str()),
                ("query", request),
                ("memory_context", memory_context),
                ("tool_context", tool_context.as_str()),
                ("instruction", "Provide a comprehensive explanation."),
            ]),
        )?;

        let mut explanation: TheoryExplanation =
            self.caller.call(&messages, self.temperature).await?;
        explanation.tool_notes = std::mem::take(&mut session.notes);

        tracing::info!(
            concept = %explanation.concept,
            key_points = explanation.key_points.len(),
            tools = ?session.used,
            "Concept explained"
        );
        Ok(session.finish(explanation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_agent_core::mocks::ScriptedLlm;
    use study_agent_skills::create_default_registry;

    const EXPLANATION: &str = r#"{"concept":"Multi-agent system","explanation":"Several agents cooperate.","key_points":["Agents specialise"],"examples":["A router with specialists"]}"#;

    #[tokio::test]
    async fn test_knowledge_base_hit_is_folded_into_prompt() {
        let llm = Arc::new(ScriptedLlm::constant(EXPLANATION));
        let registry = Arc::new(create_default_registry().await.unwrap());
        let agent = TheoryExplainerAgent::new(StructuredCaller::new(llm.clone()), registry, 0.7);

        let outcome = agent.explain("What is a multi-agent system?", "").await.unwrap();

        assert_eq!(outcome.output.concept, "Multi-agent system");
        assert_eq!(outcome.tools_used, vec![tool_names::KNOWLEDGE_BASE]);
        let call = &llm.calls()[0];
        assert_eq!(call.temperature, 0.7);
        assert!(call.prompt().contains("Knowledge base entry:"));
    }

    #[tokio::test]
    async fn test_knowledge_base_miss_is_not_an_error() {
        let llm = Arc::new(ScriptedLlm::constant(EXPLANATION));
        let registry = Arc::new(create_default_registry().await.unwrap());
        let agent = TheoryExplainerAgent::new(StructuredCaller::new(llm.clone()), registry, 0.7);

        let outcome = agent.explain("Explain photosynthesis", "").await.unwrap();

        assert!(outcome.tools_used.is_empty());
        assert!(outcome.output.tool_notes.is_empty());
        assert!(!llm.calls()[0].prompt().contains("Knowledge base entry:"));
    }
}
