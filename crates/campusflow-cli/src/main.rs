//! CLI entry point for CampusFlow.
//!
//! This binary provides the `campusflow` command with subcommands for
//! running workflow commands, an interactive loop, and inspecting the
//! registry and data store.

mod cli;
mod config;
mod helpers;
mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use campusflow_adapters::DataStore;
use campusflow_intent::{CommandOutcome, WorkflowExecutor, WorkflowParams};
use campusflow_kernel::TriggerKind;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::helpers::{build_executor, init_tracing, print_json};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine.
    dotenvy::dotenv().ok();

    let config = AppConfig::load(&cli.config)?;
    init_tracing(&config.logging.level);
    config.log_summary();

    let executor = build_executor(&config).await?;

    match cli.command {
        Commands::Run { command } => cmd_run(&executor, &command.join(" ")).await,
        Commands::Start {
            workflow,
            threshold,
            date,
            meeting,
        } => {
            let params = WorkflowParams {
                threshold,
                target_date: date,
                schedule_meeting: meeting,
            };
            cmd_start(&executor, &workflow, params).await
        }
        Commands::Repl => repl::cmd_repl(executor).await,
        Commands::Workflows => print_json(&executor.registry().list()),
        Commands::Diagram { workflow } => {
            let diagram = executor
                .registry()
                .mermaid(&workflow)
                .with_context(|| format!("unknown workflow: {workflow}"))?;
            println!("{diagram}");
            Ok(())
        }
        Commands::Students => {
            let students = executor
                .services()
                .store
                .students()
                .await
                .context("failed to list students")?;
            print_json(&students)
        }
        Commands::Logs { limit } => {
            let logs = executor
                .services()
                .store
                .logs()
                .await
                .context("failed to read action log")?;
            print_json(&logs.into_iter().take(limit).collect::<Vec<_>>())
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn cmd_run(executor: &WorkflowExecutor, command: &str) -> Result<()> {
    info!(command, "executing command");
    let outcome = executor
        .execute(command)
        .await
        .context("command execution failed")?;

    if let CommandOutcome::Unrecognized { message, .. } = &outcome {
        info!(command, "{message}");
    }
    print_json(&outcome)
}

async fn cmd_start(
    executor: &WorkflowExecutor,
    workflow: &str,
    params: WorkflowParams,
) -> Result<()> {
    let metadata = serde_json::json!({ "params": params, "source": "cli" });
    let view = executor
        .run(workflow, &params, TriggerKind::Manual, metadata)
        .await
        .with_context(|| format!("failed to run workflow {workflow}"))?;
    print_json(&view)
}
