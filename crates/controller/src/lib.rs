#![deny(unused)]
//! Workflow engine for the study assistant.
//!
//! This crate provides the agent nodes (router, memory manager, the three
//! specialists and the synthesizer), the state machine that drives them and
//! the builder that wires them to an LLM client, tools and a memory store.

pub mod agents;
pub mod builder;
pub mod workflow;

pub use agents::{NodeOutcome, FALLBACK_ANSWER};
pub use builder::WorkflowBuilder;
pub use workflow::{next, NodeId, Workflow};
