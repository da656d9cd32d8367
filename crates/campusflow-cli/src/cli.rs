//! CLI argument definitions for CampusFlow.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CampusFlow -- natural-language workflows for student outreach.
#[derive(Parser)]
#[command(
    name = "campusflow",
    version,
    about = "CampusFlow -- natural-language workflows for student outreach",
    long_about = "Turns commands like \"notify students below 75% attendance\" into tracked \
                  workflow executions against the student data store, messaging, calendar, \
                  and audit ledger."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interpret a command, run the matching workflow, and print the
    /// execution as JSON.
    Run {
        /// The natural-language command.
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Run a workflow by id without interpreting a command.
    Start {
        /// Workflow id or name, e.g. `attendance_low_75`.
        workflow: String,

        /// Attendance threshold in percent.
        #[arg(long, short)]
        threshold: Option<u32>,

        /// Meeting time, e.g. "next Friday at 2pm".
        #[arg(long, short)]
        date: Option<String>,

        /// Also schedule meetings where the workflow supports it.
        #[arg(long, short)]
        meeting: bool,
    },

    /// Interactive command loop.
    Repl,

    /// List the built-in workflows.
    Workflows,

    /// Print a workflow as a Mermaid diagram.
    Diagram {
        /// Workflow id or name.
        workflow: String,
    },

    /// List the students in the data store.
    Students,

    /// Print the action log, newest first.
    Logs {
        /// Maximum number of rows.
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },
}
