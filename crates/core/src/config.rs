use config::{Config, Environment, File};
use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::Result;

/// Application configuration.
///
/// Layered as: serde defaults, `config/default.toml`, `config/local.toml`,
/// `STUDY__SECTION__KEY` environment variables, then the legacy flat
/// variables (`LITELLM_BASE_URL`, `LITELLM_API_KEY`, `MODEL_NAME`,
/// `MEMORY_STORAGE_PATH`).
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub temperatures: TemperatureConfig,
    pub memory: MemoryConfig,
    pub workflow: WorkflowConfig,
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    /// `openai_compatible` (LiteLLM, vLLM, ...), `openai` or `anthropic`.
    pub provider: String,
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai_compatible".into(),
            base_url: "http://localhost:4000/v1".into(),
            api_key: None,
            model: "qwen3-32b".into(),
            timeout_secs: 120,
        }
    }
}

/// Sampling temperature per node.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TemperatureConfig {
    pub router: f32,
    pub theory: f32,
    pub code: f32,
    pub planner: f32,
    pub synthesizer: f32,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            router: 0.1,
            theory: 0.7,
            code: 0.3,
            planner: 0.5,
            synthesizer: 0.5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub storage_path: PathBuf,
    pub history_limit: usize,
    pub excerpt_chars: usize,
    pub retrieval_limit: usize,
    pub min_overlap: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("memory_store.json"),
            history_limit: 20,
            excerpt_chars: 500,
            retrieval_limit: 3,
            min_overlap: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Attempts per structured model call.
    pub max_attempts: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ToolsConfig {
    pub code_timeout_secs: u64,
    pub sandbox_image: String,
    pub sandbox_memory_mb: i64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            code_timeout_secs: 2,
            sandbox_image: "python:3.11-slim".into(),
            sandbox_memory_mb: 128,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    /// Load from `config/` relative to the working directory plus the environment.
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    /// Load from the given config directory plus the environment.
    pub fn load_from(dir: &str) -> Result<Self> {
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            .add_source(File::with_name(&format!("{}/local", dir)).required(false))
            // Map STUDY__MODEL__BASE_URL to model.base_url
            .add_source(Environment::with_prefix("STUDY").separator("__"))
            .build()?;

        let mut cfg: AppConfig = s.try_deserialize()?;
        cfg.apply_legacy_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Apply the flat legacy variables on top of the layered configuration.
    pub fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("LITELLM_BASE_URL") {
            self.model.base_url = url;
        }
        if let Some(key) = lookup("LITELLM_API_KEY") {
            self.model.api_key = Some(Secret::new(key));
        }
        if let Some(model) = lookup("MODEL_NAME") {
            self.model.model = model;
        }
        if let Some(path) = lookup("MEMORY_STORAGE_PATH") {
            self.memory.storage_path = PathBuf::from(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.memory.history_limit, 20);
        assert_eq!(cfg.memory.excerpt_chars, 500);
        assert_eq!(cfg.workflow.max_attempts, 3);
        assert_eq!(cfg.tools.code_timeout_secs, 2);
        assert!((cfg.temperatures.router - 0.1).abs() < f32::EPSILON);
        assert!((cfg.temperatures.theory - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_legacy_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LITELLM_BASE_URL", "http://proxy:4000/v1"),
            ("LITELLM_API_KEY", "sk-test"),
            ("MEMORY_STORAGE_PATH", "/tmp/mem.json"),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppConfig::default();
        cfg.apply_legacy_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.model.base_url, "http://proxy:4000/v1");
        assert_eq!(cfg.model.api_key.as_ref().unwrap().expose_secret(), "sk-test");
        assert_eq!(cfg.model.model, "qwen3-32b");
        assert_eq!(cfg.memory.storage_path, PathBuf::from("/tmp/mem.json"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: AppConfig = Config::builder()
            .add_source(config::File::from_str(
                "[memory]\nretrieval_limit = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.memory.retrieval_limit, 5);
        assert_eq!(cfg.memory.history_limit, 20);
        assert_eq!(cfg.model.provider, "openai_compatible");
    }
}
