//! System tests: configuration file, persisted memory and the full workflow
//! wired the way the binary wires them.

use serde_json::{json, Value};
use std::sync::Arc;

use study_agent_controller::Workflow;
use study_agent_core::{config::AppConfig, mocks::ScriptedLlm, types::Confidence};
use study_agent_store::{MemoryLimits, MemoryStore};

fn routing(query_type: &str, needs_memory: bool) -> String {
    json!({
        "query_type": query_type,
        "target_agents": [],
        "reasoning": "system test",
        "priority": 1,
        "needs_memory": needs_memory,
        "needs_tools": true
    })
    .to_string()
}

fn code_reply() -> String {
    json!({
        "problem_description": "Reverse a string",
        "solution_approach": "Slice with a negative step",
        "code_example": "fn reverse(s: &str) -> String { s.chars().rev().collect() }",
        "language": "rust",
        "explanation": "Iterate characters backwards and collect."
    })
    .to_string()
}

fn write_config(dir: &std::path::Path, storage: &std::path::Path) -> AppConfig {
    let config_dir = dir.join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("default.toml"),
        format!(
            "[memory]\nstorage_path = \"{}\"\nhistory_limit = 2\n\n[workflow]\nmax_attempts = 2\n",
            storage.display()
        ),
    )
    .unwrap();
    AppConfig::load_from(config_dir.to_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_config_file_drives_workflow_and_memory() {
    let dir = tempfile::tempdir().unwrap();
    let storage = dir.path().join("memory.json");
    let config = write_config(dir.path(), &storage);
    assert_eq!(config.memory.history_limit, 2);
    assert_eq!(config.workflow.max_attempts, 2);

    let store = Arc::new(
        MemoryStore::open(&config.memory.storage_path, MemoryLimits::from(&config.memory)).await,
    );
    assert!(store.is_persistent().await);

    let llm = Arc::new(ScriptedLlm::new(vec![
        routing("code", false),
        code_reply(),
        routing("general", false),
        "Happy to help.".to_string(),
        routing("general", false),
        "Anything else?".to_string(),
    ]));
    let workflow = Workflow::builder()
        .with_config(config)
        .with_llm(llm)
        .with_memory_store(store)
        .build()
        .await
        .unwrap();

    let first = workflow.process("How do I reverse a string in Rust?").await;
    let response = first.final_response().unwrap();
    assert!(response.answer.starts_with("## Code Help"));
    // Rust snippets are not executed.
    assert!(first.tools_used().is_empty());
    assert_eq!(response.confidence, Confidence::Medium);

    workflow.process("thanks").await;
    workflow.process("bye").await;

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&storage).unwrap()).unwrap();
    let history = raw["history"].as_array().unwrap();
    // history_limit = 2 keeps only the two latest interactions.
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["query"], "thanks");
    assert_eq!(history[1]["query"], "bye");
    assert!(raw["profile"]["languages"]
        .as_array()
        .unwrap()
        .contains(&json!("Rust")));
    assert!(raw["context"].is_object());
}

#[tokio::test]
async fn test_configured_attempt_budget_bounds_router() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &dir.path().join("memory.json"));

    let llm = Arc::new(ScriptedLlm::constant("not json"));
    let workflow = Workflow::builder()
        .with_config(config)
        .with_llm(llm.clone())
        .build()
        .await
        .unwrap();

    let state = workflow.process("Explain closures").await;

    assert_eq!(llm.call_count(), 2);
    assert!(state.final_response().is_none());
    assert!(state.error().is_some());
}

#[tokio::test]
async fn test_corrupt_memory_file_is_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let storage = dir.path().join("memory.json");
    std::fs::write(&storage, "{ not valid json").unwrap();

    let store = Arc::new(MemoryStore::open(&storage, MemoryLimits::default()).await);
    assert!(!store.is_persistent().await);

    let llm = Arc::new(ScriptedLlm::new(vec![routing("general", false), "Hi!".to_string()]));
    let workflow = Workflow::builder()
        .with_llm(llm)
        .with_memory_store(store.clone())
        .build()
        .await
        .unwrap();

    let state = workflow.process("hello").await;

    assert_eq!(state.final_response().unwrap().answer, "Hi!");
    assert_eq!(store.snapshot().await.history.len(), 1);
    assert_eq!(std::fs::read_to_string(&storage).unwrap(), "{ not valid json");
}
