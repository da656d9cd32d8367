//! Shared helper functions used across CLI subcommands.
//!
//! Includes tracing initialization, executor wiring, and output formatting.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use campusflow_adapters::{InMemoryDataStore, MockCalendar, MockLedger, MockMessenger};
use campusflow_intent::{RuleInterpreter, Services, WorkflowExecutor, WorkflowRegistry};
use campusflow_kernel::{ExecutionTracker, ExecutionView, StepStatus, TrackerMetrics};

use crate::config::AppConfig;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
///
/// Logs go to stderr so JSON printed on stdout stays machine-readable.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Build the executor and its in-process collaborators from `config`.
pub async fn build_executor(config: &AppConfig) -> Result<WorkflowExecutor> {
    let store = match &config.data.seed_path {
        Some(path) => InMemoryDataStore::from_seed_file(path)
            .await
            .with_context(|| format!("failed to load seed {}", path.display()))?,
        None => InMemoryDataStore::demo(),
    };

    let services = Services {
        store: Arc::new(store),
        messenger: Arc::new(MockMessenger::new()),
        calendar: Arc::new(MockCalendar::new()),
        ledger: Arc::new(MockLedger::new()),
    };

    let interpreter = RuleInterpreter::new().context("failed to build command interpreter")?;
    let registry = WorkflowRegistry::builtin();
    info!(workflows = registry.len(), "workflow registry ready");

    Ok(WorkflowExecutor::new(
        registry,
        ExecutionTracker::new(config.tracker),
        Arc::new(interpreter),
        services,
        config.workflows.clone(),
    ))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

/// One-line summary of a finished execution.
pub fn execution_line(view: &ExecutionView) -> String {
    let failed_steps = view
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Failed)
        .count();
    format!(
        "{}  {:<9}  {:<24}  {} steps ({} failed)  {} ms",
        view.execution_id,
        view.status.to_string(),
        view.workflow_id,
        view.steps.len(),
        failed_steps,
        view.duration_ms
    )
}

pub fn metrics_lines(metrics: &TrackerMetrics) -> Vec<String> {
    vec![
        format!("  Total executions:  {}", metrics.total_executions),
        format!("  Active:            {}", metrics.active_executions),
        format!("  Successful:        {}", metrics.successful_executions),
        format!("  Failed:            {}", metrics.failed_executions),
        format!("  Success rate:      {:.1}%", metrics.success_rate),
        format!("  Average duration:  {} ms", metrics.average_duration_ms),
    ]
}
