//! Python code executor.
//!
//! Snippets are screened before they reach the sandbox: only allow-listed
//! modules may be imported and a handful of dynamic-execution builtins are
//! refused. The sandbox run is bounded by a hard timeout.

use async_trait::async_trait;
use base64::Engine;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use study_agent_core::{
    traits::Tool,
    types::{tool_names, ToolOutput},
    Error, Result, ToolError,
};

use crate::engine::{ExecResult, SandboxConfig, SandboxEngine, SandboxId};

/// Modules a snippet may import.
pub const ALLOWED_MODULES: &[&str] = &[
    "math",
    "random",
    "itertools",
    "functools",
    "collections",
    "statistics",
    "string",
    "re",
    "json",
    "datetime",
    "heapq",
    "bisect",
    "typing",
    "dataclasses",
];

/// Default hard timeout for one snippet.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Sandbox Manager
// =============================================================================

/// Lazily creates one sandbox and reuses it for every run.
pub struct SandboxManager {
    engine: Arc<dyn SandboxEngine>,
    config: SandboxConfig,
    active_sandbox: tokio::sync::RwLock<Option<SandboxId>>,
}

impl SandboxManager {
    pub fn new(engine: Arc<dyn SandboxEngine>, config: SandboxConfig) -> Self {
        Self {
            engine,
            config,
            active_sandbox: tokio::sync::RwLock::new(None),
        }
    }

    /// Get or create the active sandbox.
    pub async fn get_or_create(&self) -> Result<SandboxId> {
        {
            let guard = self.active_sandbox.read().await;
            if let Some(ref id) = *guard {
                return Ok(id.clone());
            }
        }

        let mut guard = self.active_sandbox.write().await;
        // Another task may have created it while we waited for the write lock.
        if let Some(ref id) = *guard {
            return Ok(id.clone());
        }

        let id = self.engine.create(&self.config).await?;
        *guard = Some(id.clone());
        Ok(id)
    }

    /// Destroy the active sandbox, if any.
    pub async fn teardown(&self) -> Result<()> {
        let mut guard = self.active_sandbox.write().await;
        if let Some(id) = guard.take() {
            self.engine.destroy(&id).await?;
        }
        Ok(())
    }

    /// Destroy `id` if it is still the active sandbox, so the next run starts clean.
    ///
    /// Used after a timeout: the runaway interpreter may still hold CPU and pids.
    pub async fn recycle(&self, id: &SandboxId) {
        let mut guard = self.active_sandbox.write().await;
        if guard.as_ref() != Some(id) {
            return;
        }
        guard.take();
        match self.engine.destroy(id).await {
            Ok(()) => tracing::info!(sandbox = %id, "Sandbox recycled after timeout"),
            Err(e) => tracing::warn!(sandbox = %id, error = %e, "Failed to recycle sandbox"),
        }
    }

    pub fn engine(&self) -> &Arc<dyn SandboxEngine> {
        &self.engine
    }

    pub async fn is_available(&self) -> bool {
        self.engine.is_available().await
    }
}

// =============================================================================
// Screening
// =============================================================================

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matched anywhere, so `x = 1; import os` and `if y: import os` are caught.
        // `from a import b` is consumed whole before `import b` can match.
        Regex::new(r"\bfrom\s+([\w.]+)\s+import\b|\bimport\s+([^;\n#]+)")
            .unwrap_or_else(|e| panic!("invalid import regex: {e}"))
    })
}

fn builtin_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Method calls such as `re.compile(` are fine; bare builtins are not.
        Regex::new(concat!(
            r"(?:^|[^\w.])(open|exec|eval|compile|getattr|setattr|globals|vars|breakpoint)\s*\(",
            r"|__(?:import|builtins|builtin|subclasses|globals|loader)__",
            r"|\bimportlib\b",
        ))
        .unwrap_or_else(|e| panic!("invalid builtin regex: {e}"))
    })
}

/// Reject snippets importing non-allow-listed modules or reaching for
/// dynamic-execution builtins.
pub fn screen_code(code: &str) -> std::result::Result<(), ToolError> {
    if let Some(m) = builtin_regex().find(code) {
        return Err(ToolError::ExecutionError(format!(
            "forbidden builtin: {}",
            m.as_str().trim_start_matches(|c: char| !c.is_alphanumeric() && c != '_')
        )));
    }

    for caps in import_regex().captures_iter(code) {
        let modules: Vec<&str> = match (caps.get(1), caps.get(2)) {
            (Some(from), _) => vec![from.as_str()],
            (None, Some(list)) => list
                .as_str()
                .split(',')
                .filter_map(|part| part.split_whitespace().next())
                .map(|name| name.trim_matches(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.')))
                .collect(),
            _ => continue,
        };

        for module in modules {
            let root = module.split('.').next().unwrap_or(module);
            if !ALLOWED_MODULES.contains(&root) {
                return Err(ToolError::ExecutionError(format!(
                    "import of module '{}' is not allowed",
                    root
                )));
            }
        }
    }

    Ok(())
}

/// Shell command that feeds `code` to an isolated interpreter via stdin.
///
/// The interpreter is killed inside the container once `timeout` passes.
fn python_command(code: &str, timeout: Duration) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(code.as_bytes());
    let secs = timeout.as_secs_f64().ceil().max(1.0) as u64;
    format!(
        "printf '%s' '{}' | base64 -d | timeout -s KILL {} python3 -I -",
        encoded, secs
    )
}

// =============================================================================
// Code Executor Tool
// =============================================================================

/// Runs Python snippets in the sandbox and returns their stdout.
pub struct CodeExecutorTool {
    manager: Arc<SandboxManager>,
    timeout: Duration,
}

impl CodeExecutorTool {
    pub fn new(manager: Arc<SandboxManager>) -> Self {
        Self {
            manager,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Screen and run `code`, returning captured stdout.
    pub async fn run(&self, code: &str, timeout: Duration) -> Result<String> {
        screen_code(code)?;

        let id = self.manager.get_or_create().await?;
        let command = python_command(code, timeout);

        // Hard bound even if the engine ignores its own timeout.
        let result = tokio::time::timeout(
            timeout,
            self.manager.engine().exec(&id, &command, timeout),
        )
        .await;

        let result = match result {
            Ok(result) => result?,
            Err(_) => ExecResult {
                exit_code: -1,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: true,
            },
        };

        if result.timed_out {
            self.manager.recycle(&id).await;
            return Err(ToolError::ExecutionTimeout(timeout).into());
        }
        if result.exit_code != 0 {
            let stderr = result.stderr.trim();
            let message = stderr.lines().last().unwrap_or("non-zero exit status");
            return Err(Error::Tool(ToolError::ExecutionError(format!(
                "exit code {}: {}",
                result.exit_code, message
            ))));
        }

        Ok(result.stdout)
    }
}

#[async_trait]
impl Tool for CodeExecutorTool {
    fn name(&self) -> &str {
        tool_names::CODE_EXECUTOR
    }

    fn description(&self) -> &str {
        "Execute a Python snippet in an isolated sandbox and return its standard output"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python source to run"
                },
                "timeout_secs": {
                    "type": "number",
                    "description": "Hard timeout in seconds"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let code = args
            .get("code")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("code is required".into()))?;

        let timeout = args
            .get("timeout_secs")
            .and_then(|v| v.as_f64())
            .filter(|secs| *secs > 0.0 && *secs <= 60.0)
            .map(Duration::from_secs_f64)
            .unwrap_or(self.timeout);

        tracing::debug!(code_len = code.len(), ?timeout, "Executing code snippet");

        match self.run(code, timeout).await {
            Ok(stdout) => {
                tracing::info!(output_len = stdout.len(), "Code snippet executed");
                Ok(ToolOutput::text(stdout))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Code snippet failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_allows_listed_modules() {
        let code = "import math, random\nfrom collections import Counter\nimport itertools as it\nprint(math.pi)";
        assert!(screen_code(code).is_ok());
        assert!(screen_code("import re\npattern = re.compile(r'a+')").is_ok());
        assert!(screen_code("def f(xs):\n    return sorted(xs)\nprint(f([3, 1, 2]))").is_ok());
        assert!(screen_code("import math; x = 1\nprint(math.sqrt(x))").is_ok());
        assert!(screen_code("from math import sqrt, floor\nprint(sqrt(4))").is_ok());
        assert!(screen_code("important = 3\nprint(important)").is_ok());
    }

    #[test]
    fn test_screen_rejects_modules() {
        for code in [
            "import os",
            "import math, subprocess",
            "from socket import socket",
            "  import sys",
            "x = 1; import os\nprint(os.name)",
            "if True: import os",
            "def f():\n    import shutil; return shutil",
            "import math;import os",
        ] {
            assert!(
                matches!(screen_code(code), Err(ToolError::ExecutionError(_))),
                "{code}"
            );
        }
    }

    #[test]
    fn test_screen_rejects_builtins() {
        for code in [
            "open('x')",
            "x = eval('1+1')",
            "exec ('print(1)')",
            "__import__('os')",
            "compile('1', 'f', 'eval')",
            "getattr(__builtins__, 'ev' + 'al')('1')",
            "f = getattr(math, 'sy' + 'stem')",
            "print(().__class__.__subclasses__())",
            "importlib.import_module('os')",
            "g = globals()",
        ] {
            assert!(screen_code(code).is_err(), "{code}");
        }
    }

    #[test]
    fn test_python_command_quotes_payload() {
        let cmd = python_command("print('hi')", Duration::from_millis(1500));
        assert!(cmd.starts_with("printf '%s' '"));
        assert!(cmd.ends_with("| base64 -d | timeout -s KILL 2 python3 -I -"));
        assert!(!cmd.contains("print('hi')"));
    }
}
