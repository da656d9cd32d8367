//! Intent engine error types.
//!
//! All intent subsystems surface errors through [`IntentError`].  Each variant
//! carries enough context for callers to decide how to handle the failure.

/// Unified error type for the intent engine.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    // -- Interpreter errors --------------------------------------------------
    /// The command text could not be interpreted.
    #[error("failed to interpret command: {reason}")]
    ParseFailed { reason: String },

    /// A built-in matching pattern failed to compile.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // -- Workflow errors ------------------------------------------------------
    /// The referenced workflow does not exist.
    #[error("workflow not found: {workflow_id}")]
    WorkflowNotFound { workflow_id: String },

    /// The parameters supplied to a workflow are out of range.
    #[error("invalid parameters for `{workflow_id}`: {reason}")]
    InvalidParams { workflow_id: String, reason: String },

    /// A workflow step failed and the workflow was aborted.
    #[error("workflow step {step_id} failed: {reason}")]
    StepFailed { step_id: String, reason: String },

    // -- Upstream crate errors -----------------------------------------------
    /// An error propagated from the kernel crate.
    #[error("kernel error: {0}")]
    Kernel(#[from] campusflow_kernel::KernelError),

    /// An error propagated from a collaborator.
    #[error("adapter error: {0}")]
    Adapter(#[from] campusflow_adapters::AdapterError),

    // -- Serialization -------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;
