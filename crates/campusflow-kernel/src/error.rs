//! Kernel error types.
//!
//! All kernel subsystems surface errors through [`KernelError`], which is the
//! single error type returned by every public API in this crate.  Each variant
//! carries enough context for callers to decide how to handle the failure
//! without inspecting opaque strings.

use uuid::Uuid;

/// Unified error type for the CampusFlow kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    // -- Tracker errors -----------------------------------------------------
    /// The referenced execution is not active (never started, or already
    /// completed and moved to history).
    #[error("execution not active: {execution_id}")]
    ExecutionNotActive {
        /// The [`Uuid`] that was looked up.
        execution_id: Uuid,
    },

    /// The referenced execution is unknown to both the active set and the
    /// history.
    #[error("execution not found: {execution_id}")]
    ExecutionNotFound { execution_id: Uuid },

    // -- Serialization ------------------------------------------------------
    /// A step log or result could not be serialized for hashing.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, KernelError>;
