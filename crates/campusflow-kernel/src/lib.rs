//! CampusFlow kernel.
//!
//! This crate provides the state shared by every CampusFlow workflow run:
//!
//! - **[`definition`]** -- Static workflow definitions and step descriptors,
//!   including Mermaid diagram rendering.
//! - **[`execution`]** -- Execution contexts, ordered step logs, outcomes,
//!   and the dashboard views projected from them.
//! - **[`tracker`]** -- The in-memory execution tracker: start, append step,
//!   complete, bounded history, metrics.  Backed by [`dashmap::DashMap`].
//! - **[`proof`]** -- SHA-256 hash-chain proof over an execution's steps.
//! - **[`privacy`]** -- Hashed student identifiers for ledger and log writes.
//! - **[`events`]** -- Broadcast bus of tracker state changes.
//! - **[`error`]** -- Unified kernel error type via [`thiserror`].
//!
//! All public types are `Send + Sync` and designed for use within a
//! multi-threaded tokio runtime.

pub mod definition;
pub mod error;
pub mod events;
pub mod execution;
pub mod privacy;
pub mod proof;
pub mod tracker;

// Re-export the most commonly used types at the crate root for convenience.
pub use definition::{ServiceKind, StepDescriptor, TriggerKind, WorkflowDefinition};
pub use error::{KernelError, Result};
pub use events::{ExecutionBus, ExecutionEvent};
pub use execution::{
    ExecutionContext, ExecutionOutcome, ExecutionProof, ExecutionStatus, ExecutionView,
    ProgressStatus, StepLog, StepRecord, StepStatus, WorkflowProgress,
};
pub use tracker::{ExecutionTracker, TrackerConfig, TrackerMetrics};
