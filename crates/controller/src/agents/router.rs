//! Router node: classifies the request.

use study_agent_core::{format_instructions, types::RoutingDecision, Result};
use study_agent_model_gateway::StructuredCaller;

use super::prompts::{self, render_messages, vars};

/// Classifies a request into a category and decides what it needs.
pub struct RouterAgent {
    caller: StructuredCaller,
    temperature: f32,
}

impl RouterAgent {
    pub fn new(caller: StructuredCaller, temperature: f32) -> Self {
        Self {
            caller,
            temperature,
        }
    }

    /// Route `request`. Fails only when the model never produced a valid decision.
    pub async fn route(&self, request: &str) -> Result<RoutingDecision> {
        let instructions = format_instructions::<RoutingDecision>();
        let messages = render_messages(
            prompts::ROUTER_SYSTEM,
            prompts::ROUTER_USER,
            &vars([("format_instructions", instructions.as_str()), ("query", request)]),
        )?;

        let decision: RoutingDecision = self.caller.call(&messages, self.temperature).await?;

        tracing::info!(
            query_type = %decision.query_type,
            target_agents = ?decision.target_agents,
            needs_memory = decision.needs_memory,
            needs_tools = decision.needs_tools,
            "Routed request"
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use study_agent_core::{mocks::ScriptedLlm, types::QueryCategory, Error};

    #[tokio::test]
    async fn test_route_uses_router_temperature() {
        let llm = Arc::new(ScriptedLlm::constant(
            r#"{"query_type":"planning","target_agents":["planner"],"reasoning":"asks for a plan","needs_memory":false,"needs_tools":true}"#,
        ));
        let router = RouterAgent::new(StructuredCaller::new(llm.clone()), 0.1);

        let decision = router.route("Plan two weeks of Rust").await.unwrap();

        assert_eq!(decision.query_type, QueryCategory::Planning);
        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].temperature, 0.1);
        assert!(calls[0].prompt().contains("User query: Plan two weeks of Rust"));
    }

    #[tokio::test]
    async fn test_route_exhausts() {
        let llm = Arc::new(ScriptedLlm::constant("I think this is about theory."));
        let router = RouterAgent::new(StructuredCaller::new(llm.clone()), 0.1);

        let err = router.route("What is RAG?").await.unwrap_err();

        assert!(matches!(err, Error::ValidationExhausted { attempts: 3, .. }));
        assert_eq!(llm.call_count(), 3);
    }
}
