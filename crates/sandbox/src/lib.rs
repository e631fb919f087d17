#![deny(unused)]
//! Sandboxed code execution for the study assistant.
//!
//! Python snippets produced by the code helper are screened, then run inside
//! an isolated Docker container (no network, read-only root filesystem,
//! dropped capabilities, memory and pids limits) under a hard timeout.
//!
//! # Usage
//!
//! ```ignore
//! use study_agent_sandbox::{CodeExecutorTool, DockerSandbox, SandboxConfig, SandboxManager};
//!
//! let engine = Arc::new(DockerSandbox::new()?);
//! let manager = Arc::new(SandboxManager::new(engine, SandboxConfig::default()));
//! registry.register(Arc::new(CodeExecutorTool::new(manager))).await?;
//! ```

pub mod engine;
pub mod executor;

pub use engine::{DockerSandbox, ExecResult, MockSandbox, SandboxConfig, SandboxEngine, SandboxId};
pub use executor::{screen_code, CodeExecutorTool, SandboxManager, ALLOWED_MODULES, DEFAULT_TIMEOUT};
