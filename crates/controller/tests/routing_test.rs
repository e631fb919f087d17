//! Category routing through the full workflow.

use serde_json::json;
use std::sync::Arc;

use study_agent_controller::Workflow;
use study_agent_core::{
    mocks::{ScriptedLlm, StaticTool},
    types::{tool_names, QueryCategory},
};

fn routing(query_type: &str, needs_memory: bool) -> String {
    json!({
        "query_type": query_type,
        "target_agents": ["theory_explainer", "code_helper", "planner"],
        "reasoning": "mixed request",
        "needs_memory": needs_memory
    })
    .to_string()
}

const THEORY: &str = r#"{"concept":"Recursion","explanation":"A function calling itself.","key_points":["Needs a base case"]}"#;
const PLAN: &str = r#"{"goal":"Master recursion","steps":[{"step":"Read","description":"Read about recursion","estimated_time":"2 hours"}],"total_estimated_time":"3 hours"}"#;

#[tokio::test]
async fn test_theory_never_invokes_code_or_planner() {
    let llm = Arc::new(ScriptedLlm::new(vec![routing("theory", false), THEORY.to_string()]));
    let executor = Arc::new(StaticTool::ok(tool_names::CODE_EXECUTOR, "unused"));
    let workflow = Workflow::builder()
        .with_llm(llm.clone())
        .with_tool(executor.clone())
        .build()
        .await
        .unwrap();

    let state = workflow.process("Explain recursion and give me code and a plan").await;

    // target_agents lists all three specialists; only the category decides.
    assert_eq!(state.agent_names(), vec!["router", "theory_explainer", "synthesizer"]);
    assert_eq!(
        state.routing_decision().unwrap().query_type,
        QueryCategory::Theory
    );
    assert!(state.code_help().is_none());
    assert!(state.study_plan().is_none());
    assert_eq!(executor.call_count(), 0);
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_without_memory_flag_memory_manager_is_skipped() {
    let llm = Arc::new(ScriptedLlm::new(vec![routing("theory", false), THEORY.to_string()]));
    let workflow = Workflow::builder().with_llm(llm).build().await.unwrap();

    let state = workflow.process("Explain recursion").await;

    assert!(!state.agent_names().contains(&"memory_manager".to_string()));
    assert_eq!(state.memory_context(), "");
    assert!(state.memory_update().is_none());
    assert!(!state.final_response().unwrap().memory_accessed);
}

#[tokio::test]
async fn test_memory_flag_runs_memory_manager_before_specialist() {
    let llm = Arc::new(ScriptedLlm::new(vec![routing("planning", true), PLAN.to_string()]));
    let workflow = Workflow::builder().with_llm(llm).build().await.unwrap();

    let state = workflow.process("Plan how I should study recursion").await;

    assert_eq!(
        state.agent_names(),
        vec!["router", "memory_manager", "planner", "synthesizer"]
    );
    assert!(state.memory_accessed());
}

#[tokio::test]
async fn test_arithmetic_in_request_uses_calculator() {
    let llm = Arc::new(ScriptedLlm::new(vec![routing("planning", false), PLAN.to_string()]));
    let workflow = Workflow::builder().with_llm(llm.clone()).build().await.unwrap();

    let state = workflow
        .process("I can study 3 * 4 hours a week, plan recursion practice")
        .await;

    assert_eq!(
        state.tools_used(),
        [tool_names::CALCULATOR, tool_names::SCHEDULE]
    );
    assert!(llm.calls()[1].prompt().contains("Calculator: 3 * 4 = 12"));
    // The request's own "4 hours" wins over the plan estimate.
    let schedule = state.study_plan().unwrap().schedule.clone().unwrap();
    assert!(schedule.starts_with("Total: 4 hours"), "{schedule}");
}
