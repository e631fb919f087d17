//! Orchestration traits.

use async_trait::async_trait;
use crate::types::WorkflowState;

/// Request/response surface of the orchestration engine.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Run one request through the workflow.
    ///
    /// Never fails: every path yields a state record, with either
    /// `final_response` or `error` populated.
    async fn process(&self, request: &str) -> WorkflowState;
}
