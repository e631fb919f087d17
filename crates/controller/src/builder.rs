//! Builder for the workflow engine.

use std::sync::Arc;
use std::time::Duration;

use study_agent_core::{
    config::AppConfig,
    traits::{LlmClient, Tool, ToolRegistry},
    Error, Result,
};
use study_agent_model_gateway::StructuredCaller;
use study_agent_skills::create_default_registry;
use study_agent_store::{MemoryLimits, MemoryStore};

use crate::agents::{
    CodeHelperAgent, MemoryManagerAgent, PlannerAgent, RouterAgent, SynthesizerAgent,
    TheoryExplainerAgent,
};
use crate::workflow::Workflow;

/// Builder for constructing a [`Workflow`].
///
/// Only the LLM client is required. Without a memory store the workflow
/// keeps memory in-process; without a tool registry it starts from the
/// built-in calculator, knowledge base and schedule tools.
pub struct WorkflowBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    memory_store: Option<Arc<MemoryStore>>,
    tools: Option<Arc<dyn ToolRegistry>>,
    extra_tools: Vec<Arc<dyn Tool>>,
}

impl WorkflowBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            llm: None,
            memory_store: None,
            tools: None,
            extra_tools: Vec::new(),
        }
    }

    /// Set the configuration (temperatures, attempt budget, retrieval, tool timeouts).
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the LLM client.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the memory store shared by the memory manager and synthesizer.
    pub fn with_memory_store(mut self, store: Arc<MemoryStore>) -> Self {
        self.memory_store = Some(store);
        self
    }

    /// Replace the tool registry.
    pub fn with_tools(mut self, tools: Arc<dyn ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Register an additional tool (e.g. the sandboxed code executor).
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.extra_tools.push(tool);
        self
    }

    /// Build the workflow.
    pub async fn build(self) -> Result<Workflow> {
        let llm = self
            .llm
            .ok_or_else(|| Error::config("an LLM client is required to build the workflow"))?;

        let tools: Arc<dyn ToolRegistry> = match self.tools {
            Some(tools) => tools,
            None => Arc::new(create_default_registry().await?),
        };
        for tool in self.extra_tools {
            tools.register(tool).await?;
        }

        let store = match self.memory_store {
            Some(store) => store,
            None => Arc::new(MemoryStore::in_memory(MemoryLimits::from(&self.config.memory))),
        };

        let cfg = &self.config;
        let caller = StructuredCaller::new(llm).with_max_attempts(cfg.workflow.max_attempts);
        let temps = &cfg.temperatures;
        let code_timeout = Duration::from_secs(cfg.tools.code_timeout_secs.max(1));

        tracing::info!(
            max_attempts = caller.max_attempts(),
            tools = tools.list().await.len(),
            persistent_memory = store.is_persistent().await,
            "Building workflow"
        );

        Ok(Workflow {
            router: RouterAgent::new(caller.clone(), temps.router),
            memory_manager: MemoryManagerAgent::new(
                store.clone(),
                cfg.memory.retrieval_limit,
                cfg.memory.min_overlap,
            ),
            theory: TheoryExplainerAgent::new(caller.clone(), tools.clone(), temps.theory),
            code: CodeHelperAgent::new(caller.clone(), tools.clone(), temps.code, code_timeout),
            planner: PlannerAgent::new(caller.clone(), tools, store.clone(), temps.planner),
            synthesizer: SynthesizerAgent::new(caller, store, temps.synthesizer),
        })
    }
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_agent_core::mocks::{ScriptedLlm, StaticTool};
    use study_agent_core::types::tool_names;

    #[tokio::test]
    async fn test_build_requires_llm() {
        let result = WorkflowBuilder::new().build().await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_extra_tool_is_registered() {
        let registry = Arc::new(study_agent_skills::DefaultToolRegistry::new());
        WorkflowBuilder::new()
            .with_llm(Arc::new(ScriptedLlm::constant("{}")))
            .with_tools(registry.clone())
            .with_tool(Arc::new(StaticTool::ok(tool_names::CODE_EXECUTOR, "ok")))
            .build()
            .await
            .unwrap();

        assert!(registry.get(tool_names::CODE_EXECUTOR).await.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_tool_fails_build() {
        let result = WorkflowBuilder::new()
            .with_llm(Arc::new(ScriptedLlm::constant("{}")))
            .with_tool(Arc::new(StaticTool::ok(tool_names::CALCULATOR, "0")))
            .build()
            .await;

        assert!(result.is_err());
    }
}
