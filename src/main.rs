#![deny(unused)]
//! Study Assistant - a multi-agent study helper.
//!
//! Routes each request to a specialist (theory, code, planning), optionally
//! recalls earlier conversations, and synthesizes one answer. Requests come
//! from the command line or an interactive prompt.

mod telemetry;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use study_agent_controller::Workflow;
use study_agent_core::{config::AppConfig, types::WorkflowState};
use study_agent_model_gateway::create_client;
use study_agent_sandbox::{CodeExecutorTool, DockerSandbox, SandboxConfig, SandboxEngine, SandboxManager};
use study_agent_store::{MemoryLimits, MemoryStore};

const EXIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;
    telemetry::configure_tracing(&config.logging)?;

    tracing::info!("Starting Study Assistant v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Model
    // =========================================================================
    let llm = create_client(&config.model)?;

    // =========================================================================
    // Memory
    // =========================================================================
    let store = Arc::new(
        MemoryStore::open(&config.memory.storage_path, MemoryLimits::from(&config.memory)).await,
    );
    if !store.is_persistent().await {
        tracing::warn!(
            path = %config.memory.storage_path.display(),
            "Memory file unusable; keeping memory in-process for this run"
        );
    }

    // =========================================================================
    // Sandbox
    // =========================================================================
    let sandbox_manager = match DockerSandbox::new() {
        Ok(engine) => {
            let engine = Arc::new(engine);
            if engine.is_available().await {
                let sandbox_config = SandboxConfig {
                    image: config.tools.sandbox_image.clone(),
                    memory_limit: config.tools.sandbox_memory_mb * 1024 * 1024,
                    ..SandboxConfig::default()
                };
                tracing::info!(image = %sandbox_config.image, "Code sandbox initialized");
                Some(Arc::new(SandboxManager::new(engine, sandbox_config)))
            } else {
                tracing::warn!("Docker daemon not reachable; code execution disabled");
                None
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Docker unavailable; code execution disabled");
            None
        }
    };

    // =========================================================================
    // Workflow
    // =========================================================================
    let mut builder = Workflow::builder()
        .with_config(config.clone())
        .with_llm(llm)
        .with_memory_store(store);
    if let Some(manager) = &sandbox_manager {
        let timeout = Duration::from_secs(config.tools.code_timeout_secs.max(1));
        builder = builder.with_tool(Arc::new(
            CodeExecutorTool::new(manager.clone()).with_timeout(timeout),
        ));
    }
    let workflow = builder.build().await?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = if args.is_empty() {
        interactive(&workflow).await
    } else {
        let state = workflow.process(&args.join(" ")).await;
        print_state(&state);
        match state.error() {
            Some(error) => Err(anyhow::anyhow!("request failed: {}", error)),
            None => Ok(()),
        }
    };

    if let Some(manager) = sandbox_manager {
        if let Err(e) = manager.teardown().await {
            tracing::warn!(error = %e, "Failed to tear down sandbox");
        }
    }

    outcome
}

async fn interactive(workflow: &Workflow) -> anyhow::Result<()> {
    println!("Study Assistant. Ask about a concept, some code, or a study plan. Type 'quit' to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&request.to_lowercase().as_str()) {
            break;
        }

        let state = workflow.process(request).await;
        print_state(&state);
    }

    println!("Goodbye!");
    Ok(())
}

fn print_state(state: &WorkflowState) {
    match state.final_response() {
        Some(response) => {
            println!("\n{}\n", response.answer);
            println!("Agents: {}", response.agents_involved.join(" -> "));
            if response.tools_used.is_empty() {
                println!("Tools: none");
            } else {
                println!("Tools: {}", response.tools_used.join(", "));
            }
            println!("Memory accessed: {}", response.memory_accessed);
            println!("Confidence: {}", response.confidence.as_str());
        }
        None => {
            eprintln!("Error: {}", state.error().unwrap_or("no response produced"));
        }
    }
}
