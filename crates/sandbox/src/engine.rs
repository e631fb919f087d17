//! Sandbox execution engine.
//!
//! The `SandboxEngine` trait and a Docker implementation using `bollard`.
//! Containers run with no network, a read-only root filesystem, all
//! capabilities dropped, and memory and pids limits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use study_agent_core::{Error, Result};

// =============================================================================
// Sandbox Types
// =============================================================================

/// Unique identifier for a sandbox instance.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SandboxId(pub String);

impl std::fmt::Display for SandboxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for creating a sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Docker image with a `python3` interpreter.
    pub image: String,
    /// Maximum memory in bytes.
    pub memory_limit: i64,
    /// CPU quota per 100ms period.
    pub cpu_quota: i64,
    /// Maximum number of processes.
    pub pids_limit: i64,
    /// Working directory inside the container (tmpfs).
    pub workdir: String,
    /// Unprivileged user the container runs as.
    pub user: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: "python:3.11-slim".to_string(),
            memory_limit: 128 * 1024 * 1024,
            cpu_quota: 50_000,
            pids_limit: 32,
            workdir: "/workspace".to_string(),
            user: "65534:65534".to_string(),
        }
    }
}

/// Result of executing a command in the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ExecResult {
    /// Exit code 0 and no timeout.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            timed_out: false,
        }
    }

    pub fn failed(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }
}

// =============================================================================
// Sandbox Engine Trait
// =============================================================================

/// Backend for running untrusted code in isolation.
#[async_trait]
pub trait SandboxEngine: Send + Sync {
    /// Create and start a sandbox.
    async fn create(&self, config: &SandboxConfig) -> Result<SandboxId>;

    /// Run a shell command inside the sandbox.
    async fn exec(&self, id: &SandboxId, command: &str, timeout: Duration) -> Result<ExecResult>;

    /// Destroy the sandbox and clean up resources.
    async fn destroy(&self, id: &SandboxId) -> Result<()>;

    /// Whether the backend is reachable (e.g. Docker daemon running).
    async fn is_available(&self) -> bool;
}

// =============================================================================
// Docker Sandbox Implementation
// =============================================================================

/// Docker-based sandbox engine.
pub struct DockerSandbox {
    docker: bollard::Docker,
}

impl DockerSandbox {
    /// Connect to the local Docker daemon.
    pub fn new() -> Result<Self> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            Error::internal(format!(
                "Failed to connect to Docker daemon: {}. Is Docker running?",
                e
            ))
        })?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl SandboxEngine for DockerSandbox {
    async fn create(&self, config: &SandboxConfig) -> Result<SandboxId> {
        use bollard::container::{Config, CreateContainerOptions};
        use bollard::models::{HostConfig, Mount, MountTmpfsOptions, MountTypeEnum};

        let sandbox_id = format!("study-sandbox-{}", uuid::Uuid::new_v4());

        let host_config = HostConfig {
            memory: Some(config.memory_limit),
            cpu_quota: Some(config.cpu_quota),
            cpu_period: Some(100_000),
            network_mode: Some("none".to_string()),
            mounts: Some(vec![Mount {
                target: Some(config.workdir.clone()),
                typ: Some(MountTypeEnum::TMPFS),
                tmpfs_options: Some(MountTmpfsOptions {
                    size_bytes: Some(config.memory_limit / 4),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            readonly_rootfs: Some(true),
            cap_drop: Some(vec!["ALL".to_string()]),
            security_opt: Some(vec!["no-new-privileges:true".to_string()]),
            pids_limit: Some(config.pids_limit),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(config.image.clone()),
            working_dir: Some(config.workdir.clone()),
            user: Some(config.user.clone()),
            env: Some(vec!["PYTHONDONTWRITEBYTECODE=1".to_string()]),
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            host_config: Some(host_config),
            labels: Some(std::collections::HashMap::from([(
                "managed-by".to_string(),
                "study-assistant-sandbox".to_string(),
            )])),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: sandbox_id.as_str(),
            platform: None,
        };

        self.docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| Error::internal(format!("Failed to create sandbox container: {}", e)))?;

        self.docker
            .start_container::<String>(&sandbox_id, None)
            .await
            .map_err(|e| Error::internal(format!("Failed to start sandbox container: {}", e)))?;

        tracing::info!(sandbox_id = %sandbox_id, image = %config.image, "Sandbox container started");

        Ok(SandboxId(sandbox_id))
    }

    async fn exec(&self, id: &SandboxId, command: &str, timeout: Duration) -> Result<ExecResult> {
        use bollard::container::LogOutput;
        use bollard::exec::{CreateExecOptions, StartExecResults};
        use futures::StreamExt;

        let exec_options = CreateExecOptions {
            cmd: Some(vec!["sh", "-c", command]),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(&id.0, exec_options)
            .await
            .map_err(|e| Error::internal(format!("Failed to create exec in sandbox: {}", e)))?;

        let start_result = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| Error::internal(format!("Failed to start exec in sandbox: {}", e)))?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        if let StartExecResults::Attached { mut output, .. } = start_result {
            let collect = async {
                while let Some(msg) = output.next().await {
                    match msg {
                        Ok(LogOutput::StdOut { message }) => {
                            stdout.push_str(&String::from_utf8_lossy(&message));
                        }
                        Ok(LogOutput::StdErr { message }) => {
                            stderr.push_str(&String::from_utf8_lossy(&message));
                        }
                        Ok(_) => {}
                        Err(e) => {
                            stderr.push_str(&format!("\n[sandbox error: {}]", e));
                            break;
                        }
                    }
                }
            };

            if tokio::time::timeout(timeout, collect).await.is_err() {
                tracing::warn!(sandbox = %id, ?timeout, "Sandbox exec timed out");
                return Ok(ExecResult {
                    exit_code: -1,
                    stdout,
                    stderr,
                    timed_out: true,
                });
            }
        }

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| Error::internal(format!("Failed to inspect exec result: {}", e)))?;

        Ok(ExecResult {
            exit_code: inspect.exit_code.unwrap_or(-1),
            stdout,
            stderr,
            timed_out: false,
        })
    }

    async fn destroy(&self, id: &SandboxId) -> Result<()> {
        use bollard::container::RemoveContainerOptions;

        self.docker
            .remove_container(
                &id.0,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| Error::internal(format!("Failed to remove sandbox container: {}", e)))?;

        tracing::info!(sandbox_id = %id, "Sandbox container destroyed");
        Ok(())
    }

    async fn is_available(&self) -> bool {
        self.docker.ping().await.is_ok()
    }
}

// =============================================================================
// Mock Sandbox (for testing without Docker)
// =============================================================================

/// Scripted sandbox for tests.
///
/// Returns queued results in order (a default success once empty) and
/// records every command. An optional delay simulates slow code.
#[derive(Default)]
pub struct MockSandbox {
    responses: tokio::sync::Mutex<VecDeque<ExecResult>>,
    commands: tokio::sync::Mutex<Vec<String>>,
    destroyed: tokio::sync::Mutex<Vec<SandboxId>>,
    delay: Option<Duration>,
}

impl MockSandbox {
    pub fn new(responses: Vec<ExecResult>) -> Self {
        Self {
            responses: tokio::sync::Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    /// Delay every exec by `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Commands executed so far.
    pub async fn commands(&self) -> Vec<String> {
        self.commands.lock().await.clone()
    }

    /// Sandboxes destroyed so far.
    pub async fn destroyed(&self) -> Vec<SandboxId> {
        self.destroyed.lock().await.clone()
    }
}

#[async_trait]
impl SandboxEngine for MockSandbox {
    async fn create(&self, _config: &SandboxConfig) -> Result<SandboxId> {
        Ok(SandboxId(format!("mock-sandbox-{}", uuid::Uuid::new_v4())))
    }

    async fn exec(&self, _id: &SandboxId, command: &str, timeout: Duration) -> Result<ExecResult> {
        self.commands.lock().await.push(command.to_string());

        if let Some(delay) = self.delay {
            if delay >= timeout {
                tokio::time::sleep(timeout).await;
                return Ok(ExecResult {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: String::new(),
                    timed_out: true,
                });
            }
            tokio::time::sleep(delay).await;
        }

        Ok(self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| ExecResult::ok("[mock] executed\n")))
    }

    async fn destroy(&self, id: &SandboxId) -> Result<()> {
        self.destroyed.lock().await.push(id.clone());
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_config_defaults() {
        let config = SandboxConfig::default();
        assert_eq!(config.image, "python:3.11-slim");
        assert_eq!(config.memory_limit, 128 * 1024 * 1024);
        assert_eq!(config.workdir, "/workspace");
    }

    #[test]
    fn test_exec_result_success() {
        assert!(ExecResult::ok("hello").success());
        assert!(!ExecResult::failed(1, "boom").success());
        let timed_out = ExecResult {
            timed_out: true,
            ..ExecResult::ok("")
        };
        assert!(!timed_out.success());
    }

    #[tokio::test]
    async fn test_mock_sandbox_replays_and_records() {
        let mock = MockSandbox::new(vec![ExecResult::ok("first\n")]);
        let id = mock.create(&SandboxConfig::default()).await.unwrap();

        let first = mock.exec(&id, "echo first", Duration::from_secs(1)).await.unwrap();
        let second = mock.exec(&id, "echo second", Duration::from_secs(1)).await.unwrap();

        assert_eq!(first.stdout, "first\n");
        assert!(second.success());
        assert_eq!(mock.commands().await, vec!["echo first", "echo second"]);
        mock.destroy(&id).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_sandbox_delay_beyond_timeout() {
        let mock = MockSandbox::default().with_delay(Duration::from_secs(10));
        let id = mock.create(&SandboxConfig::default()).await.unwrap();

        let result = mock.exec(&id, "sleep", Duration::from_secs(2)).await.unwrap();

        assert!(result.timed_out);
    }
}
