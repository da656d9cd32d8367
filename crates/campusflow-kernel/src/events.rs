//! Execution event bus.
//!
//! The tracker publishes an [`ExecutionEvent`] for every state change so a
//! dashboard can follow runs as they happen instead of polling.  The bus is a
//! thin wrapper over [`tokio::sync::broadcast`]; events are wrapped in
//! [`Arc`] so broadcasting to several subscribers does not clone payloads.
//!
//! # Usage
//!
//! ```rust,no_run
//! # use campusflow_kernel::events::ExecutionBus;
//! # async fn example() {
//! let bus = ExecutionBus::new(256);
//! let mut rx = bus.subscribe();
//! let event = rx.recv().await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::execution::{ExecutionStatus, StepStatus};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A tracker state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// A new execution was opened.
    ExecutionStarted {
        execution_id: Uuid,
        workflow_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A step log was appended.
    StepRecorded {
        execution_id: Uuid,
        step_id: String,
        status: StepStatus,
        timestamp: DateTime<Utc>,
    },

    /// An execution reached a terminal status and moved to history.
    ExecutionFinished {
        execution_id: Uuid,
        status: ExecutionStatus,
        /// Hex proof root, when one could be computed.
        proof: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    /// The execution this event belongs to.
    pub fn execution_id(&self) -> Uuid {
        match self {
            Self::ExecutionStarted { execution_id, .. }
            | Self::StepRecorded { execution_id, .. }
            | Self::ExecutionFinished { execution_id, .. } => *execution_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// Publish/subscribe bus for [`ExecutionEvent`]s.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct ExecutionBus {
    inner: Arc<broadcast::Sender<Arc<ExecutionEvent>>>,
}

impl ExecutionBus {
    /// Create a bus with the given channel capacity.
    ///
    /// A subscriber that falls more than `capacity` events behind receives
    /// [`broadcast::error::RecvError::Lagged`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(sender),
        }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of receivers that will observe it.  With no
    /// subscribers the event is dropped and `0` is returned.
    pub fn publish(&self, event: ExecutionEvent) -> usize {
        match self.inner.send(Arc::new(event)) {
            Ok(n) => {
                tracing::trace!(receivers = n, "execution event published");
                n
            }
            Err(_) => {
                tracing::trace!("execution event published but no active receivers");
                0
            }
        }
    }

    /// Subscribe to all future events.  Earlier events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ExecutionEvent>> {
        self.inner.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.receiver_count()
    }
}

impl Default for ExecutionBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
