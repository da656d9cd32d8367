//! Adapter error types.
//!
//! All collaborator implementations surface errors through [`AdapterError`].
//! Each variant carries enough context for callers to decide how to handle
//! the failure without inspecting opaque strings.

/// Unified error type for CampusFlow collaborators.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// An I/O operation failed (e.g. reading a seed file).
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// A request to an external service failed.
    #[error("{service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    /// A messaging recipient could not be reached.
    #[error("recipient unreachable: {recipient}")]
    Unreachable { recipient: String },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid input provided to a collaborator.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Catch-all for unexpected internal errors.  Prefer a typed variant
    /// whenever possible.
    #[error("internal adapter error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;
