#![deny(unused)]
//! Memory store for the study assistant.
//!
//! Persists a bounded interaction history, a growing user profile and an open
//! context map to a single JSON file, with keyword-overlap retrieval.

pub mod keyword;
pub mod memory;

pub use memory::{MemoryLimits, MemoryStore};
