//! Mock implementations of core traits for testing.
//!
//! Shared by the unit and integration tests of every crate in the workspace.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{
    error::ToolError,
    traits::{ChatMessage, LlmClient, LlmResponse, LlmUsage, Tool},
    types::ToolOutput,
    Error, Result,
};

// =============================================================================
// Scripted LLM Client
// =============================================================================

/// One call observed by [`ScriptedLlm`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

impl RecordedCall {
    /// All message contents joined, for substring assertions.
    pub fn prompt(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Mock LLM that replays a script of replies in order.
///
/// When the script runs out the last entry is repeated.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    last: Mutex<Option<std::result::Result<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlm {
    /// Create a mock with a queue of successful replies.
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same reply.
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response])
    }

    /// Create a mock whose every call fails at the transport level.
    pub fn failing(message: &str) -> Self {
        let llm = Self::new(Vec::<String>::new());
        llm.push_error(message);
        llm
    }

    /// Append a reply to the script.
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(reply.into()));
    }

    /// Append a transport failure to the script.
    pub fn push_error(&self, message: impl Into<String>) {
        self.script.lock().unwrap().push_back(Err(message.into()));
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, messages: &[ChatMessage], temperature: f32) -> Result<LlmResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            temperature,
        });

        let next = {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            match script.pop_front() {
                Some(entry) => {
                    *last = Some(entry.clone());
                    entry
                }
                None => last
                    .clone()
                    .unwrap_or_else(|| Err("script is empty".to_string())),
            }
        };

        match next {
            Ok(content) => Ok(LlmResponse {
                content,
                finish_reason: "stop".to_string(),
                usage: LlmUsage {
                    prompt_tokens: 10,
                    completion_tokens: 20,
                    total_tokens: 30,
                },
            }),
            Err(message) => Err(Error::model_provider(message)),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

// =============================================================================
// Static Tool
// =============================================================================

/// Tool returning a fixed outcome and counting its invocations.
pub struct StaticTool {
    name: String,
    outcome: std::result::Result<String, ToolError>,
    calls: Mutex<Vec<Value>>,
}

impl StaticTool {
    pub fn ok(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: Ok(content.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str, error: ToolError) -> Self {
        Self {
            name: name.to_string(),
            outcome: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Static test tool"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "type": "object" })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(args);
        match &self.outcome {
            Ok(content) => Ok(ToolOutput::text(content.clone())),
            Err(e) => Err(Error::Tool(e.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_llm_replays_then_repeats() {
        let llm = ScriptedLlm::new(vec!["one", "two"]);
        assert_eq!(llm.complete("a", 0.1).await.unwrap().content, "one");
        assert_eq!(llm.complete("b", 0.2).await.unwrap().content, "two");
        assert_eq!(llm.complete("c", 0.3).await.unwrap().content, "two");
        assert_eq!(llm.call_count(), 3);
        assert!((llm.calls()[1].temperature - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_failing_llm() {
        let llm = ScriptedLlm::failing("connection refused");
        assert!(llm.complete("a", 0.0).await.is_err());
        assert!(llm.complete("b", 0.0).await.is_err());
    }
}
