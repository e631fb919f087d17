#![deny(unused)]
//! Core types, traits, and error definitions for the study assistant.
//!
//! This crate provides the foundational building blocks shared across all layers:
//! the per-request state record, the routing and specialist output schemas,
//! memory records, schema validation, prompt rendering and configuration.

pub mod config;
pub mod error;
pub mod mocks;
pub mod schema;
pub mod template;
pub mod traits;
pub mod types;

pub use error::{Error, Result, ToolError};
pub use schema::{format_instructions, parse_structured, StructuredOutput, Validation};
pub use traits::*;
pub use types::*;
