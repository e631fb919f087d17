//! Planner node.

use serde_json::json;
use std::sync::Arc;

use study_agent_core::{
    format_instructions,
    traits::ToolRegistry,
    types::{tool_names, StudyPlan},
    Result,
};
use study_agent_model_gateway::StructuredCaller;
use study_agent_skills::parse_duration;
use study_agent_store::MemoryStore;

use super::prompts::{self, render_messages, vars};
use super::{NodeOutcome, ToolSession};

/// Builds study plans and lays them out on a schedule.
///
/// The learner profile (topics, languages, goals) is always read, whether or
/// not the request asked for memory.
pub struct PlannerAgent {
    caller: StructuredCaller,
    tools: Arc<dyn ToolRegistry>,
    store: Arc<MemoryStore>,
    temperature: f32,
}

impl PlannerAgent {
    pub fn new(
        caller: StructuredCaller,
        tools: Arc<dyn ToolRegistry>,
        store: Arc<MemoryStore>,
        temperature: f32,
    ) -> Self {
        Self {
            caller,
            tools,
            store,
            temperature,
        }
    }

    pub async fn plan(&self, request: &str, memory_context: &str) -> Result<NodeOutcome<StudyPlan>> {
        let mut session = ToolSession::new(self.tools.clone());

        let tool_context = session
            .calculate(request)
            .await
            .map(|result| format!("Calculator: {}", result))
            .unwrap_or_default();

        let user_profile = self.store.profile().await.summary_line().unwrap_or_default();

        let instructions = format_instructions::<StudyPlan>();
        let messages = render_messages(
            prompts::PLANNER_SYSTEM,
            prompts::SPECIALIST_USER,
            &vars([
                ("format_instructions", instructions.as_str()),
                ("query", request),
                ("memory_context", memory_context),
                ("tool_context", tool_context.as_str()),
                ("instruction", "Create a comprehensive study plan."),
                ("user_profile", user_profile.as_str()),
            ]),
        )?;

        let mut plan: StudyPlan = self.caller.call(&messages, self.temperature).await?;

        // The user's own time frame wins over the model's estimate.
        let duration = match parse_duration(request) {
            Ok(d) => d.to_string(),
            Err(_) => plan.total_estimated_time.clone(),
        };
        let args = json!({ "duration": duration, "steps": plan.steps });
        if let Some(output) = session.run(tool_names::SCHEDULE, args).await {
            plan.schedule = Some(output.content);
        }
        plan.tool_notes = std::mem::take(&mut session.notes);

        tracing::info!(
            goal = %plan.goal,
            steps = plan.steps.len(),
            duration = %duration,
            scheduled = plan.schedule.is_some(),
            "Study plan produced"
        );
        Ok(session.finish(plan))
    }
}
