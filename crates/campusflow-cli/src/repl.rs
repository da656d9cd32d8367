//! Subcommand: `campusflow repl` -- interactive command loop.
//!
//! Each line is interpreted and executed as a workflow command, except for
//! the built-ins `history`, `metrics`, `logs`, `workflows`, `help`, and
//! `quit`.  The tracker lives for the whole session, so history and metrics
//! accumulate across commands.

use std::io::{self, Write as _};

use anyhow::Result;
use tracing::{info, warn};

use campusflow_adapters::DataStore;
use campusflow_intent::{CommandOutcome, WorkflowExecutor};

use crate::helpers::{execution_line, metrics_lines};

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Quit,
    Help,
    History,
    Metrics,
    Logs,
    Workflows,
    Command(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Empty,
        "quit" | "exit" => Input::Quit,
        "help" => Input::Help,
        "history" => Input::History,
        "metrics" => Input::Metrics,
        "logs" => Input::Logs,
        "workflows" => Input::Workflows,
        other => Input::Command(other),
    }
}

const HELP: &str = "  Commands:
    <text>      interpret and run a workflow, e.g. \"notify students below 75%\"
    history     recent executions, newest first
    metrics     execution statistics
    logs        the action log, newest first
    workflows   the built-in workflows
    quit        leave the loop";

/// Run the interactive loop until EOF or `quit`.
pub async fn cmd_repl(executor: WorkflowExecutor) -> Result<()> {
    println!();
    println!("  CampusFlow v{}", env!("CARGO_PKG_VERSION"));
    println!("  Workflows: {}", executor.registry().len());
    println!("  Type a command, 'help', or 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut line_buf = String::new();

    loop {
        print!("> ");
        io::stdout().flush().ok();

        line_buf.clear();
        match stdin.read_line(&mut line_buf) {
            Ok(0) => {
                println!();
                info!("EOF received, exiting");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("  Error reading input: {e}");
                continue;
            }
        }

        match classify(&line_buf) {
            Input::Empty => continue,
            Input::Quit => {
                info!("user requested exit");
                break;
            }
            Input::Help => println!("{HELP}"),
            Input::History => {
                let history = executor.tracker().recent();
                if history.is_empty() {
                    println!("  No executions yet.");
                }
                for view in &history {
                    println!("  {}", execution_line(view));
                }
            }
            Input::Metrics => {
                for line in metrics_lines(&executor.tracker().metrics()) {
                    println!("{line}");
                }
            }
            Input::Logs => match executor.services().store.logs().await {
                Ok(logs) if logs.is_empty() => println!("  Action log is empty."),
                Ok(logs) => {
                    for entry in logs {
                        println!(
                            "  #{:<4} {}  {:<36}  {}…",
                            entry.id,
                            entry.timestamp.format("%H:%M:%S"),
                            entry.action,
                            &entry.student_hash[..entry.student_hash.len().min(12)]
                        );
                    }
                }
                Err(e) => eprintln!("  Error: {e}"),
            },
            Input::Workflows => {
                for listing in executor.registry().list() {
                    println!("  {:<24} {} ({} steps)", listing.id, listing.name, listing.step_count);
                }
            }
            Input::Command(command) => match executor.execute(command).await {
                Ok(CommandOutcome::Executed(view)) => {
                    println!("  {}", execution_line(&view));
                    if let Some(result) = &view.result {
                        match serde_json::to_string_pretty(&result.data) {
                            Ok(text) => println!("{text}"),
                            Err(e) => warn!(error = %e, "could not render result"),
                        }
                    }
                    println!();
                }
                Ok(CommandOutcome::Unrecognized { message, .. }) => {
                    println!("  {message}. Type 'help' for examples.");
                }
                Err(e) => eprintln!("  Error: {e}"),
            },
        }
    }

    info!("shutting down");
    Ok(())
}
