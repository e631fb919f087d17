#![deny(unused)]
//! Tools for the study assistant.
//!
//! This crate provides:
//! - Calculator (safe arithmetic evaluator)
//! - Knowledge base (predefined concept lookup)
//! - Schedule (duration normalization and breakdown)
//! - Tool registry

pub mod calculator;
pub mod knowledge_base;
pub mod registry;
pub mod schedule;

pub use calculator::{evaluate, extract_expression, CalculatorTool};
pub use knowledge_base::{KnowledgeBase, KnowledgeBaseTool, KnowledgeEntry};
pub use registry::{create_default_registry, DefaultToolRegistry};
pub use schedule::{format_schedule, parse_duration, ScheduleTool, StudyDuration};
