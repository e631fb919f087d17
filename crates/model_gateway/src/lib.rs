#![deny(unused)]
//! Model gateway for the study assistant.
//!
//! This crate provides:
//! - The structured call wrapper (schema validation with bounded retry)
//! - An OpenAI-compatible HTTP client (LiteLLM, vLLM, Ollama, OpenAI)
//! - A Rig client adapter for hosted providers
//! - A factory that picks the client from configuration

pub mod openai_compatible;
pub mod rig_client;
pub mod structured;

pub use openai_compatible::OpenAiCompatibleClient;
pub use rig_client::{RigConfig, RigLlmClient, RigProvider};
pub use structured::{StructuredCaller, DEFAULT_MAX_ATTEMPTS};

use std::sync::Arc;
use std::time::Duration;

use study_agent_core::{config::ModelConfig, traits::LlmClient, Error, Result};

/// Create an LLM client from the `model` configuration section.
pub fn create_client(config: &ModelConfig) -> Result<Arc<dyn LlmClient>> {
    tracing::info!(provider = %config.provider, model = %config.model, "Creating LLM client");

    match config.provider.to_lowercase().as_str() {
        "openai_compatible" | "litellm" | "vllm" => {
            let client = OpenAiCompatibleClient::new(
                &config.base_url,
                config.model.clone(),
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(client))
        }
        "openai" => Ok(Arc::new(RigLlmClient::new(RigConfig::openai(&config.model))?)),
        "anthropic" => Ok(Arc::new(RigLlmClient::new(RigConfig::anthropic(&config.model))?)),
        other => Err(Error::ModelProvider(format!("Unsupported provider: {}", other))),
    }
}
