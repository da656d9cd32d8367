//! Command interpretation and workflow execution for CampusFlow.
//!
//! This crate provides:
//!
//! - **Interpreter**: free text to workflow id and parameters via
//!   [`interpreter::CommandInterpreter`]; the offline
//!   [`interpreter::RuleInterpreter`] is the shipped implementation.
//! - **Registry**: the four built-in university workflows via
//!   [`registry::WorkflowRegistry`].
//! - **Executor**: runs a workflow against the collaborators and records it
//!   in the kernel's execution tracker via [`executor::WorkflowExecutor`].

pub mod error;
pub mod executor;
pub mod interpreter;
pub mod registry;
pub mod workflows;

pub use error::{IntentError, Result};
pub use executor::{CommandOutcome, ExecutorConfig, UNRECOGNIZED_MESSAGE, WorkflowExecutor};
pub use interpreter::{
    CommandInterpreter, DEFAULT_TARGET_DATE, Interpretation, RuleInterpreter, WorkflowParams,
};
pub use registry::{WorkflowKind, WorkflowListing, WorkflowRegistry};
pub use workflows::{
    AssignmentSummary, CriticalSummary, LowAttendanceSummary, PerformanceSummary, PerformanceTier,
    Services, StudentReport,
};
