//! Rig LLM client adapter.
//!
//! Wraps Rig's hosted provider agents behind the `LlmClient` trait. API keys
//! come from the provider's usual environment variable.

use async_trait::async_trait;

use study_agent_core::{
    traits::{ChatMessage, LlmClient, LlmResponse, LlmUsage},
    Error, Result,
};

use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;

/// Provider type for Rig clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigProvider {
    OpenAI,
    Anthropic,
}

impl RigProvider {
    fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Configuration for Rig client.
#[derive(Debug, Clone)]
pub struct RigConfig {
    pub provider: RigProvider,
    pub model: String,
    pub max_tokens: u64,
}

impl RigConfig {
    pub fn openai(model: impl Into<String>) -> Self {
        Self {
            provider: RigProvider::OpenAI,
            model: model.into(),
            max_tokens: 4096,
        }
    }

    pub fn anthropic(model: impl Into<String>) -> Self {
        Self {
            provider: RigProvider::Anthropic,
            model: model.into(),
            max_tokens: 4096,
        }
    }
}

/// Rig-based LLM client.
pub struct RigLlmClient {
    config: RigConfig,
}

impl RigLlmClient {
    /// Create a client, failing early when the provider's key is absent.
    pub fn new(config: RigConfig) -> Result<Self> {
        let var = config.provider.api_key_var();
        if std::env::var(var).is_err() {
            return Err(Error::model_provider(format!("{} not set", var)));
        }
        Ok(Self { config })
    }

    async fn call_openai(&self, preamble: &str, prompt: &str, temperature: f32) -> Result<String> {
        use rig::providers::openai;

        let client = openai::Client::from_env();
        let agent = client
            .agent(&self.config.model)
            .preamble(preamble)
            .temperature(temperature as f64)
            .max_tokens(self.config.max_tokens)
            .build();

        agent
            .prompt(prompt)
            .await
            .map_err(|e| Error::model_provider(format!("OpenAI error: {}", e)))
    }

    async fn call_anthropic(&self, preamble: &str, prompt: &str, temperature: f32) -> Result<String> {
        use rig::providers::anthropic;

        let client = anthropic::Client::from_env();
        let agent = client
            .agent(&self.config.model)
            .preamble(preamble)
            .temperature(temperature as f64)
            .max_tokens(self.config.max_tokens)
            .build();

        agent
            .prompt(prompt)
            .await
            .map_err(|e| Error::model_provider(format!("Anthropic error: {}", e)))
    }
}

/// Split messages into a preamble (system messages) and a transcript prompt.
fn split_messages(messages: &[ChatMessage]) -> (String, String) {
    let mut preamble = Vec::new();
    let mut prompt = String::new();

    for msg in messages {
        match msg.role.as_str() {
            "system" => preamble.push(msg.content.as_str()),
            "user" if messages.iter().filter(|m| m.role != "system").count() == 1 => {
                prompt.push_str(&msg.content);
            }
            "user" => prompt.push_str(&format!("User: {}\n\n", msg.content)),
            "assistant" => prompt.push_str(&format!("Assistant: {}\n\n", msg.content)),
            other => prompt.push_str(&format!("{}: {}\n\n", other, msg.content)),
        }
    }

    (preamble.join("\n\n"), prompt)
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn chat(&self, messages: &[ChatMessage], temperature: f32) -> Result<LlmResponse> {
        let (preamble, prompt) = split_messages(messages);

        tracing::debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            temperature,
            prompt_len = prompt.len(),
            "Calling LLM"
        );

        let content = match self.config.provider {
            RigProvider::OpenAI => self.call_openai(&preamble, &prompt, temperature).await?,
            RigProvider::Anthropic => self.call_anthropic(&preamble, &prompt, temperature).await?,
        };

        // Rig's prompt API does not surface usage; estimate at ~4 chars per token.
        let prompt_tokens = ((preamble.len() + prompt.len()) / 4) as u64;
        let completion_tokens = (content.len() / 4) as u64;
        Ok(LlmResponse {
            content,
            finish_reason: "stop".to_string(),
            usage: LlmUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
