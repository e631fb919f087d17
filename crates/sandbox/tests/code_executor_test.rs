//! Code executor integration tests.
//!
//! Tool → SandboxManager → SandboxEngine (MockSandbox). No Docker required.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use study_agent_core::{traits::Tool, Error, ToolError};
use study_agent_sandbox::{CodeExecutorTool, ExecResult, MockSandbox, SandboxConfig, SandboxManager};

// =============================================================================
// Helpers
// =============================================================================

fn executor(engine: Arc<MockSandbox>) -> CodeExecutorTool {
    let manager = Arc::new(SandboxManager::new(engine, SandboxConfig::default()));
    CodeExecutorTool::new(manager)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_successful_run_returns_stdout() {
    let engine = Arc::new(MockSandbox::new(vec![ExecResult::ok("[1, 2, 3]\n")]));
    let tool = executor(engine.clone());

    let output = tool
        .execute(json!({ "code": "print(sorted([3, 1, 2]))" }))
        .await
        .unwrap();

    assert!(output.success);
    assert_eq!(output.content, "[1, 2, 3]\n");
    let commands = engine.commands().await;
    assert_eq!(commands.len(), 1);
    assert!(commands[0].contains("python3 -I -"));
}

#[tokio::test]
async fn test_forbidden_import_never_reaches_sandbox() {
    let engine = Arc::new(MockSandbox::default());
    let tool = executor(engine.clone());

    let err = tool
        .execute(json!({ "code": "import os\nos.system('ls')" }))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Tool(ToolError::ExecutionError(_))));
    assert!(engine.commands().await.is_empty());
}

#[tokio::test]
async fn test_nonzero_exit_is_execution_error() {
    let engine = Arc::new(MockSandbox::new(vec![ExecResult::failed(
        1,
        "Traceback (most recent call last):\nZeroDivisionError: division by zero",
    )]));
    let tool = executor(engine);

    let err = tool.execute(json!({ "code": "print(1/0)" })).await.unwrap_err();

    match err {
        Error::Tool(ToolError::ExecutionError(msg)) => assert!(msg.contains("ZeroDivisionError")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_code_times_out() {
    let engine = Arc::new(MockSandbox::default().with_delay(Duration::from_secs(30)));
    let tool = executor(engine).with_timeout(Duration::from_secs(2));

    let err = tool.execute(json!({ "code": "while True: pass" })).await.unwrap_err();

    assert!(matches!(err, Error::Tool(ToolError::ExecutionTimeout(d)) if d == Duration::from_secs(2)));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_recycles_sandbox() {
    let engine = Arc::new(MockSandbox::default().with_delay(Duration::from_secs(30)));
    let manager = Arc::new(SandboxManager::new(engine.clone(), SandboxConfig::default()));
    let tool = CodeExecutorTool::new(manager.clone()).with_timeout(Duration::from_secs(2));

    let stuck = manager.get_or_create().await.unwrap();
    tool.execute(json!({ "code": "while True: pass" })).await.unwrap_err();

    assert_eq!(engine.destroyed().await, vec![stuck.clone()]);
    assert!(engine.commands().await[0].contains("timeout -s KILL 2 python3"));
    let fresh = manager.get_or_create().await.unwrap();
    assert_ne!(stuck, fresh);
}

#[tokio::test]
async fn test_finished_run_keeps_sandbox() {
    let engine = Arc::new(MockSandbox::default());
    let manager = Arc::new(SandboxManager::new(engine.clone(), SandboxConfig::default()));
    let tool = CodeExecutorTool::new(manager.clone());

    let first = manager.get_or_create().await.unwrap();
    tool.execute(json!({ "code": "print(1)" })).await.unwrap();

    assert!(engine.destroyed().await.is_empty());
    assert_eq!(manager.get_or_create().await.unwrap(), first);
}

#[tokio::test]
async fn test_missing_code_argument() {
    let tool = executor(Arc::new(MockSandbox::default()));
    let err = tool.execute(json!({})).await.unwrap_err();
    assert!(matches!(err, Error::Tool(ToolError::InvalidArguments(_))));
}

#[tokio::test]
async fn test_sandbox_is_created_once_and_torn_down() {
    let engine = Arc::new(MockSandbox::default());
    let manager = Arc::new(SandboxManager::new(engine, SandboxConfig::default()));

    let first = manager.get_or_create().await.unwrap();
    let second = manager.get_or_create().await.unwrap();
    assert_eq!(first, second);

    manager.teardown().await.unwrap();
    let third = manager.get_or_create().await.unwrap();
    assert_ne!(first, third);
}
