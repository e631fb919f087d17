//! Code helper node.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use study_agent_core::{
    format_instructions,
    traits::ToolRegistry,
    types::{tool_names, CodeHelp},
    Result,
};
use study_agent_model_gateway::StructuredCaller;

use super::prompts::{self, render_messages, vars};
use super::{NodeOutcome, ToolSession};

/// Modules a generated Python example may import.
const PROMPT_ALLOWED_MODULES: &str = "math, random, itertools, functools, collections, statistics, string, re, json, datetime, heapq, bisect, typing, dataclasses";

/// Answers programming questions and runs the Python example it produces.
pub struct CodeHelperAgent {
    caller: StructuredCaller,
    tools: Arc<dyn ToolRegistry>,
    temperature: f32,
    code_timeout: Duration,
}

impl CodeHelperAgent {
    pub fn new(
        caller: StructuredCaller,
        tools: Arc<dyn ToolRegistry>,
        temperature: f32,
        code_timeout: Duration,
    ) -> Self {
        Self {
            caller,
            tools,
            temperature,
            code_timeout,
        }
    }

    pub async fn help(&self, request: &str, memory_context: &str) -> Result<NodeOutcome<CodeHelp>> {
        let mut session = ToolSession::new(self.tools.clone());

        let tool_context = session
            .calculate(request)
            .await
            .map(|result| format!("Calculator: {}", result))
            .unwrap_or_default();

        let instructions = format_instructions::<CodeHelp>();
        let messages = render_messages(
            prompts::CODE_SYSTEM,
            prompts::SPECIALIST_USER,
            &vars([
                ("format_instructions", instructions.as_str()),
                ("allowed_modules", PROMPT_ALLOWED_MODULES),
                ("query", request),
                ("memory_context", memory_context),
                ("tool_context", tool_context.as_str()),
                ("instruction", "Provide comprehensive coding help."),
            ]),
        )?;

        let mut help: CodeHelp = self.caller.call(&messages, self.temperature).await?;

        let snippet = help
            .code_example
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string);
        match snippet {
            Some(code) if help.is_python() => {
                let args = json!({
                    "code": code,
                    "timeout_secs": self.code_timeout.as_secs_f64(),
                });
                if let Some(output) = session.run(tool_names::CODE_EXECUTOR, args).await {
                    help.execution_output = Some(output.content);
                }
            }
            Some(_) => {
                tracing::debug!(language = ?help.language, "Example is not Python; not executing");
            }
            None => {}
        }
        help.tool_notes = std::mem::take(&mut session.notes);

        tracing::info!(
            has_example = help.code_example.is_some(),
            executed = help.execution_output.is_some(),
            tools = ?session.used,
            "Code help produced"
        );
        Ok(session.finish(help))
    }
}
