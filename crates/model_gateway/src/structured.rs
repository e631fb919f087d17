//! Structured call wrapper.
//!
//! Every structured model call goes through [`StructuredCaller::call`]: the
//! reply is parsed against the target schema and the same prompt is re-sent
//! on failure, up to a fixed attempt budget with no backoff.

use std::sync::Arc;

use study_agent_core::{
    parse_structured,
    traits::{ChatMessage, LlmClient},
    Error, Result, StructuredOutput, Validation,
};

/// Default attempt budget per structured call.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Retrying wrapper around an [`LlmClient`].
#[derive(Clone)]
pub struct StructuredCaller {
    llm: Arc<dyn LlmClient>,
    max_attempts: usize,
}

impl StructuredCaller {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the attempt budget (minimum 1).
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Call the model until its reply validates as `T`.
    ///
    /// Transport failures count as failed attempts. Exhaustion yields
    /// `Error::ValidationExhausted`.
    pub async fn call<T: StructuredOutput>(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<T> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let reply = match self.llm.chat(messages, temperature).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!(
                        schema = T::SCHEMA_NAME,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Model call failed"
                    );
                    last_error = e.to_string();
                    continue;
                }
            };

            match parse_structured::<T>(&reply.content) {
                Validation::Valid(value) => {
                    tracing::debug!(schema = T::SCHEMA_NAME, attempt, "Structured output validated");
                    return Ok(value);
                }
                Validation::Invalid(reason) => {
                    tracing::warn!(
                        schema = T::SCHEMA_NAME,
                        attempt,
                        max_attempts = self.max_attempts,
                        reason = %reason,
                        "Structured output failed validation"
                    );
                    last_error = reason;
                }
            }
        }

        Err(Error::ValidationExhausted {
            schema: T::SCHEMA_NAME,
            attempts: self.max_attempts,
            last_error,
        })
    }

    /// Single free-text call, no schema and no retry.
    pub async fn text(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let reply = self.llm.chat(messages, temperature).await?;
        Ok(reply.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_agent_core::mocks::ScriptedLlm;
    use study_agent_core::types::{QueryCategory, RoutingDecision};

    const VALID: &str = r#"{"query_type":"code","target_agents":["code_helper"],"reasoning":"asks for code","needs_memory":false,"needs_tools":true}"#;

    #[tokio::test]
    async fn test_exhausts_after_three_attempts() {
        let llm = Arc::new(ScriptedLlm::constant("not json at all"));
        let caller = StructuredCaller::new(llm.clone());

        let err = caller
            .call::<RoutingDecision>(&[ChatMessage::user("route me")], 0.1)
            .await
            .unwrap_err();

        assert_eq!(llm.call_count(), 3);
        match err {
            Error::ValidationExhausted { schema, attempts, .. } => {
                assert_eq!(schema, "RoutingDecision");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_retries_same_prompt_until_valid() {
        let llm = Arc::new(ScriptedLlm::new(vec!["{\"query_type\":\"opera\"}", VALID]));
        let caller = StructuredCaller::new(llm.clone());

        let decision = caller
            .call::<RoutingDecision>(&[ChatMessage::user("route me")], 0.1)
            .await
            .unwrap();

        assert_eq!(decision.query_type, QueryCategory::Code);
        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].prompt(), calls[1].prompt());
    }

    #[tokio::test]
    async fn test_transport_error_counts_as_attempt() {
        let llm = Arc::new(ScriptedLlm::new(Vec::<String>::new()));
        llm.push_error("connection reset");
        llm.push_reply(VALID);
        let caller = StructuredCaller::new(llm.clone()).with_max_attempts(2);

        let decision = caller
            .call::<RoutingDecision>(&[ChatMessage::user("route me")], 0.1)
            .await
            .unwrap();

        assert!(decision.needs_tools);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_text_call() {
        let llm = Arc::new(ScriptedLlm::constant("plain answer"));
        let caller = StructuredCaller::new(llm);
        let text = caller.text(&[ChatMessage::user("hi")], 0.5).await.unwrap();
        assert_eq!(text, "plain answer");
    }
}
