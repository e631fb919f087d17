//! Workflow engine.
//!
//! An explicit state machine over the agent nodes:
//!
//! ```text
//! Router -> [MemoryManager] -> [TheoryExplainer | CodeHelper | Planner] -> Synthesizer -> End
//! ```
//!
//! Transitions are decided by the pure [`next`] function; node execution
//! lives in [`Workflow::run_node`]. Any error short-circuits to `End`.

use async_trait::async_trait;
use std::fmt;

use study_agent_core::{
    traits::Orchestrator,
    types::{AgentId, SpecialistOutput, WorkflowState},
};

use crate::agents::{
    CodeHelperAgent, MemoryManagerAgent, PlannerAgent, RouterAgent, SynthesizerAgent,
    TheoryExplainerAgent,
};

/// Node of the workflow state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Router,
    MemoryManager,
    TheoryExplainer,
    CodeHelper,
    Planner,
    Synthesizer,
    End,
}

impl NodeId {
    fn from_agent(agent: AgentId) -> Self {
        match agent {
            AgentId::Router => Self::Router,
            AgentId::MemoryManager => Self::MemoryManager,
            AgentId::TheoryExplainer => Self::TheoryExplainer,
            AgentId::CodeHelper => Self::CodeHelper,
            AgentId::Planner => Self::Planner,
            AgentId::Synthesizer => Self::Synthesizer,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Router => "router",
            Self::MemoryManager => "memory_manager",
            Self::TheoryExplainer => "theory_explainer",
            Self::CodeHelper => "code_helper",
            Self::Planner => "planner",
            Self::Synthesizer => "synthesizer",
            Self::End => "end",
        };
        f.write_str(name)
    }
}

/// Decide the node that follows `current`.
pub fn next(state: &WorkflowState, current: NodeId) -> NodeId {
    if state.has_error() {
        return NodeId::End;
    }

    match current {
        NodeId::Router => match state.routing_decision() {
            Some(decision) if decision.needs_memory => NodeId::MemoryManager,
            Some(_) => specialist_or_synthesizer(state),
            None => NodeId::End,
        },
        NodeId::MemoryManager => specialist_or_synthesizer(state),
        NodeId::TheoryExplainer | NodeId::CodeHelper | NodeId::Planner => NodeId::Synthesizer,
        NodeId::Synthesizer | NodeId::End => NodeId::End,
    }
}

fn specialist_or_synthesizer(state: &WorkflowState) -> NodeId {
    state
        .routing_decision()
        .and_then(|d| d.query_type.specialist())
        .map(NodeId::from_agent)
        .unwrap_or(NodeId::Synthesizer)
}

/// The assembled multi-agent workflow. Build with [`crate::WorkflowBuilder`].
pub struct Workflow {
    pub(crate) router: RouterAgent,
    pub(crate) memory_manager: MemoryManagerAgent,
    pub(crate) theory: TheoryExplainerAgent,
    pub(crate) code: CodeHelperAgent,
    pub(crate) planner: PlannerAgent,
    pub(crate) synthesizer: SynthesizerAgent,
}

impl Workflow {
    /// Create a new builder.
    pub fn builder() -> crate::builder::WorkflowBuilder {
        crate::builder::WorkflowBuilder::new()
    }

    /// Run one request to completion. Never panics and never returns an error:
    /// failures are recorded in the returned state.
    pub async fn process(&self, request: &str) -> WorkflowState {
        let mut state = WorkflowState::new(request);
        let mut node = NodeId::Router;

        tracing::info!(request_len = request.len(), "Processing request");

        while node != NodeId::End {
            tracing::debug!(node = %node, "Entering node");
            self.run_node(node, &mut state).await;
            let following = next(&state, node);
            tracing::debug!(node = %node, next = %following, "Leaving node");
            node = following;
        }

        match state.error() {
            Some(error) => tracing::warn!(error = %error, agents = ?state.agent_names(), "Request failed"),
            None => tracing::info!(
                agents = ?state.agent_names(),
                tools = ?state.tools_used(),
                "Request completed"
            ),
        }
        state
    }

    async fn run_node(&self, node: NodeId, state: &mut WorkflowState) {
        match node {
            NodeId::Router => {
                state.record_agent(AgentId::Router);
                let result = self.router.route(state.request()).await;
                match result {
                    Ok(decision) => state.set_routing(decision),
                    Err(e) => state.fail(format!("router: {}", e)),
                }
            }
            NodeId::MemoryManager => {
                state.record_agent(AgentId::MemoryManager);
                let update = self.memory_manager.retrieve(state.request()).await;
                state.set_memory(update);
            }
            NodeId::TheoryExplainer => {
                state.record_agent(AgentId::TheoryExplainer);
                let result = self
                    .theory
                    .explain(state.request(), state.memory_context())
                    .await;
                match result {
                    Ok(outcome) => {
                        for tool in outcome.tools_used {
                            state.record_tool(tool);
                        }
                        state.set_specialist(SpecialistOutput::Theory(outcome.output));
                    }
                    Err(e) => state.fail(format!("theory_explainer: {}", e)),
                }
            }
            NodeId::CodeHelper => {
                state.record_agent(AgentId::CodeHelper);
                let result = self.code.help(state.request(), state.memory_context()).await;
                match result {
                    Ok(outcome) => {
                        for tool in outcome.tools_used {
                            state.record_tool(tool);
                        }
                        state.set_specialist(SpecialistOutput::Code(outcome.output));
                    }
                    Err(e) => state.fail(format!("code_helper: {}", e)),
                }
            }
            NodeId::Planner => {
                state.record_agent(AgentId::Planner);
                let result = self.planner.plan(state.request(), state.memory_context()).await;
                match result {
                    Ok(outcome) => {
                        for tool in outcome.tools_used {
                            state.record_tool(tool);
                        }
                        state.set_specialist(SpecialistOutput::Plan(outcome.output));
                    }
                    Err(e) => state.fail(format!("planner: {}", e)),
                }
            }
            NodeId::Synthesizer => {
                state.record_agent(AgentId::Synthesizer);
                let response = self.synthesizer.synthesize(state).await;
                self.synthesizer.remember(state, &response).await;
                state.set_final_response(response);
            }
            NodeId::End => {}
        }
    }
}

#[async_trait]
impl Orchestrator for Workflow {
    async fn process(&self, request: &str) -> WorkflowState {
        Workflow::process(self, request).await
    }
}
