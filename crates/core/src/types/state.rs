use serde::Serialize;

use super::{
    AgentId, CodeHelp, FinalResponse, MemoryUpdate, RoutingDecision, StudyPlan, TheoryExplanation,
};

/// Output of whichever specialist ran for a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecialistOutput {
    Theory(TheoryExplanation),
    Code(CodeHelp),
    Plan(StudyPlan),
}

impl SpecialistOutput {
    pub fn agent(&self) -> AgentId {
        match self {
            Self::Theory(_) => AgentId::TheoryExplainer,
            Self::Code(_) => AgentId::CodeHelper,
            Self::Plan(_) => AgentId::Planner,
        }
    }

    pub fn tool_notes(&self) -> &[String] {
        match self {
            Self::Theory(t) => &t.tool_notes,
            Self::Code(c) => &c.tool_notes,
            Self::Plan(p) => &p.tool_notes,
        }
    }
}

/// Per-request state record threaded through the workflow.
///
/// The request text is fixed at construction. Every other field is written
/// through the methods below by the workflow engine; `agents_involved` and
/// `tools_used` only grow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowState {
    request: String,
    routing_decision: Option<RoutingDecision>,
    specialist: Option<SpecialistOutput>,
    memory_update: Option<MemoryUpdate>,
    memory_context: Option<String>,
    final_response: Option<FinalResponse>,
    agents_involved: Vec<AgentId>,
    tools_used: Vec<String>,
    error: Option<String>,
}

impl WorkflowState {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            ..Default::default()
        }
    }

    // =========================================================================
    // Readers
    // =========================================================================

    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn routing_decision(&self) -> Option<&RoutingDecision> {
        self.routing_decision.as_ref()
    }

    pub fn specialist(&self) -> Option<&SpecialistOutput> {
        self.specialist.as_ref()
    }

    pub fn theory_explanation(&self) -> Option<&TheoryExplanation> {
        match &self.specialist {
            Some(SpecialistOutput::Theory(t)) => Some(t),
            _ => None,
        }
    }

    pub fn code_help(&self) -> Option<&CodeHelp> {
        match &self.specialist {
            Some(SpecialistOutput::Code(c)) => Some(c),
            _ => None,
        }
    }

    pub fn study_plan(&self) -> Option<&StudyPlan> {
        match &self.specialist {
            Some(SpecialistOutput::Plan(p)) => Some(p),
            _ => None,
        }
    }

    pub fn memory_update(&self) -> Option<&MemoryUpdate> {
        self.memory_update.as_ref()
    }

    /// Retrieved context, empty when memory was not consulted.
    pub fn memory_context(&self) -> &str {
        self.memory_context.as_deref().unwrap_or("")
    }

    pub fn final_response(&self) -> Option<&FinalResponse> {
        self.final_response.as_ref()
    }

    pub fn agents_involved(&self) -> &[AgentId] {
        &self.agents_involved
    }

    /// Agent identifiers as strings, in invocation order.
    pub fn agent_names(&self) -> Vec<String> {
        self.agents_involved.iter().map(|a| a.as_str().to_string()).collect()
    }

    pub fn tools_used(&self) -> &[String] {
        &self.tools_used
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// True once the synthesizer has answered or the workflow failed.
    pub fn is_complete(&self) -> bool {
        self.final_response.is_some() || self.error.is_some()
    }

    pub fn memory_accessed(&self) -> bool {
        self.memory_update.is_some()
    }

    // =========================================================================
    // Writers
    // =========================================================================

    pub fn set_routing(&mut self, decision: RoutingDecision) {
        if self.routing_decision.is_none() {
            self.routing_decision = Some(decision);
        }
    }

    pub fn set_memory(&mut self, update: MemoryUpdate) {
        self.memory_context = Some(update.retrieved_context.clone());
        self.memory_update = Some(update);
    }

    /// Store specialist output. Only the first specialist to report is kept.
    pub fn set_specialist(&mut self, output: SpecialistOutput) {
        if self.specialist.is_none() {
            self.specialist = Some(output);
        }
    }

    pub fn set_final_response(&mut self, response: FinalResponse) {
        if self.final_response.is_none() && self.error.is_none() {
            self.final_response = Some(response);
        }
    }

    pub fn record_agent(&mut self, agent: AgentId) {
        self.agents_involved.push(agent);
    }

    pub fn record_tool(&mut self, tool: impl Into<String>) {
        self.tools_used.push(tool.into());
    }

    /// Record the first failure. Later failures are ignored.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }
}
