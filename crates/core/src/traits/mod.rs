//! Core traits for the study assistant.
//!
//! Traits are organized by the seam they cover:
//! - `llm`: model invocation (LlmClient)
//! - `skills`: tools and the tool registry (Tool, ToolRegistry)
//! - `controller`: the request/response surface (Orchestrator)

pub mod controller;
pub mod llm;
pub mod skills;

pub use controller::*;
pub use llm::*;
pub use skills::*;
