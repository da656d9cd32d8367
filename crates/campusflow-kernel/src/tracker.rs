//! In-memory execution tracker.
//!
//! The tracker owns every [`ExecutionContext`] from the moment a workflow
//! starts until it is evicted from history:
//!
//! ```text
//! start ──► active (Running) ──log_step*──► complete ──► history (Completed | Failed)
//! ```
//!
//! Active executions live in a [`DashMap`] so concurrent workflows can append
//! steps without contending on a global lock.  History is a bounded
//! [`VecDeque`] behind a mutex; once it reaches capacity the oldest record is
//! dropped.  An execution is in exactly one of the two places at any time.
//!
//! # Example
//!
//! ```rust
//! # use std::sync::Arc;
//! # use campusflow_kernel::definition::{StepDescriptor, ServiceKind, TriggerKind, WorkflowDefinition};
//! # use campusflow_kernel::execution::{ExecutionOutcome, ExecutionStatus, StepRecord};
//! # use campusflow_kernel::tracker::{ExecutionTracker, TrackerConfig};
//! let workflow = Arc::new(WorkflowDefinition {
//!     id: "demo".into(),
//!     name: "Demo".into(),
//!     description: "one step".into(),
//!     trigger: TriggerKind::Manual,
//!     steps: vec![StepDescriptor::new("FETCH", ServiceKind::DataStore, "fetch")],
//!     output: "DemoSummary".into(),
//! });
//!
//! let tracker = ExecutionTracker::new(TrackerConfig::default());
//! let ctx = tracker.start(workflow, TriggerKind::Manual, serde_json::Value::Null);
//! tracker
//!     .log_step(ctx.execution_id, "FETCH", StepRecord::completed(serde_json::json!({"rows": 3})))
//!     .unwrap();
//! let done = tracker
//!     .complete(ctx.execution_id, ExecutionOutcome::success(serde_json::Value::Null))
//!     .unwrap();
//! assert_eq!(done.status, ExecutionStatus::Completed);
//! assert!(done.proof.is_some());
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::definition::{TriggerKind, WorkflowDefinition};
use crate::error::{KernelError, Result};
use crate::events::{ExecutionBus, ExecutionEvent};
use crate::execution::{
    ExecutionContext, ExecutionOutcome, ExecutionProof, ExecutionStatus, ExecutionView,
    StepLog, StepRecord, WorkflowProgress,
};
use crate::proof;

// ---------------------------------------------------------------------------
// Configuration and metrics
// ---------------------------------------------------------------------------

/// Tracker limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum number of finished executions retained.  Values below 1 are
    /// raised to 1 so a just-completed execution stays queryable.
    pub history_capacity: usize,
    /// Number of records [`ExecutionTracker::recent`] returns.
    pub default_history_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            history_capacity: 500,
            default_history_limit: 50,
        }
    }
}

/// Aggregate statistics over the retained history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerMetrics {
    pub total_executions: usize,
    pub active_executions: usize,
    pub successful_executions: usize,
    pub failed_executions: usize,
    /// Percentage of retained executions that completed, `0.0` when empty.
    pub success_rate: f64,
    pub average_duration_ms: i64,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Concurrent execution tracker.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct ExecutionTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    active: DashMap<Uuid, ExecutionContext>,
    history: Mutex<VecDeque<ExecutionContext>>,
    config: TrackerConfig,
    bus: ExecutionBus,
}

impl ExecutionTracker {
    /// Create a tracker with its own event bus.
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_bus(config, ExecutionBus::default())
    }

    /// Create a tracker that publishes to an existing bus.
    #[must_use]
    pub fn with_bus(config: TrackerConfig, bus: ExecutionBus) -> Self {
        if config.history_capacity == 0 {
            tracing::warn!("history capacity 0 raised to 1");
        }
        let config = TrackerConfig {
            history_capacity: config.history_capacity.max(1),
            ..config
        };
        Self {
            inner: Arc::new(TrackerInner {
                active: DashMap::new(),
                history: Mutex::new(VecDeque::with_capacity(config.history_capacity.min(1024))),
                config,
                bus,
            }),
        }
    }

    /// The bus this tracker publishes to.
    pub fn bus(&self) -> &ExecutionBus {
        &self.inner.bus
    }

    pub fn config(&self) -> TrackerConfig {
        self.inner.config
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Open a new execution for `workflow` and return a snapshot of it.
    pub fn start(
        &self,
        workflow: Arc<WorkflowDefinition>,
        trigger: TriggerKind,
        metadata: serde_json::Value,
    ) -> ExecutionContext {
        let context = ExecutionContext::open(workflow, trigger, metadata);
        let execution_id = context.execution_id;

        tracing::info!(
            execution_id = %execution_id,
            workflow = %context.workflow.name,
            trigger = %trigger,
            "execution started"
        );

        self.inner.active.insert(execution_id, context.clone());
        self.inner.bus.publish(ExecutionEvent::ExecutionStarted {
            execution_id,
            workflow_id: context.workflow.id.clone(),
            timestamp: context.start_time,
        });

        context
    }

    /// Append a step log to an active execution.
    pub fn log_step(
        &self,
        execution_id: Uuid,
        step_id: &str,
        record: StepRecord,
    ) -> Result<StepLog> {
        let step = {
            let mut entry = self.inner.active.get_mut(&execution_id).ok_or_else(|| {
                tracing::warn!(execution_id = %execution_id, step_id, "step logged for inactive execution");
                KernelError::ExecutionNotActive { execution_id }
            })?;
            entry.push_step(step_id, record)
        };

        tracing::info!(
            execution_id = %execution_id,
            step_id = %step.id,
            status = ?step.status,
            "step recorded"
        );

        self.inner.bus.publish(ExecutionEvent::StepRecorded {
            execution_id,
            step_id: step.id.clone(),
            status: step.status,
            timestamp: step.timestamp,
        });

        Ok(step)
    }

    /// Proof over the steps an active execution has logged so far.
    pub fn snapshot_proof(&self, execution_id: Uuid) -> Result<ExecutionProof> {
        let entry = self
            .inner
            .active
            .get(&execution_id)
            .ok_or(KernelError::ExecutionNotActive { execution_id })?;
        proof::generate(entry.value())
    }

    /// Finalize an active execution and move it to history.
    ///
    /// The terminal status follows `outcome.success`.  The proof is computed
    /// over the final step log; if it cannot be computed the execution is
    /// still completed, without a proof.
    pub fn complete(
        &self,
        execution_id: Uuid,
        outcome: ExecutionOutcome,
    ) -> Result<ExecutionContext> {
        // History is locked before the active entry is removed so a
        // concurrent `status` call always finds the execution in one of them.
        let mut history = self.lock_history();

        let (_, mut context) = self.inner.active.remove(&execution_id).ok_or_else(|| {
            tracing::warn!(execution_id = %execution_id, "completion requested for inactive execution");
            KernelError::ExecutionNotActive { execution_id }
        })?;

        context.finish(outcome);
        context.proof = match proof::generate(&context) {
            Ok(proof) => Some(proof),
            Err(e) => {
                tracing::warn!(execution_id = %execution_id, error = %e, "proof generation failed");
                None
            }
        };

        history.push_back(context.clone());
        while history.len() > self.inner.config.history_capacity {
            if let Some(evicted) = history.pop_front() {
                tracing::debug!(execution_id = %evicted.execution_id, "history entry evicted");
            }
        }
        drop(history);

        tracing::info!(
            execution_id = %execution_id,
            status = %context.status,
            steps = context.steps.len(),
            "execution completed"
        );

        self.inner.bus.publish(ExecutionEvent::ExecutionFinished {
            execution_id,
            status: context.status,
            proof: context.proof.as_ref().map(|p| p.proof.clone()),
            timestamp: context.end_time.unwrap_or_else(Utc::now),
        });

        Ok(context)
    }

    // -- Queries ------------------------------------------------------------

    /// Look up an execution, active executions first.
    pub fn status(&self, execution_id: Uuid) -> Option<ExecutionView> {
        if let Some(entry) = self.inner.active.get(&execution_id) {
            return Some(entry.view(true));
        }
        self.lock_history()
            .iter()
            .find(|c| c.execution_id == execution_id)
            .map(|c| c.view(false))
    }

    /// Step-by-step progress of an execution against its definition.
    pub fn progress(&self, execution_id: Uuid) -> Result<WorkflowProgress> {
        if let Some(entry) = self.inner.active.get(&execution_id) {
            return Ok(entry.progress());
        }
        self.lock_history()
            .iter()
            .find(|c| c.execution_id == execution_id)
            .map(ExecutionContext::progress)
            .ok_or(KernelError::ExecutionNotFound { execution_id })
    }

    /// Recompute the proof of a finished execution and compare.
    pub fn verify(&self, execution_id: Uuid) -> Result<bool> {
        let history = self.lock_history();
        let context = history
            .iter()
            .find(|c| c.execution_id == execution_id)
            .ok_or(KernelError::ExecutionNotFound { execution_id })?;
        proof::verify(context)
    }

    /// All running executions, oldest first.
    pub fn active(&self) -> Vec<ExecutionView> {
        let mut views: Vec<ExecutionView> =
            self.inner.active.iter().map(|e| e.value().view(true)).collect();
        views.sort_by_key(|v| v.start_time);
        views
    }

    /// Up to `limit` finished executions, newest first.
    pub fn history(&self, limit: usize) -> Vec<ExecutionView> {
        self.lock_history()
            .iter()
            .rev()
            .take(limit)
            .map(|c| c.view(false))
            .collect()
    }

    /// [`history`](Self::history) with the configured default limit.
    pub fn recent(&self) -> Vec<ExecutionView> {
        self.history(self.inner.config.default_history_limit)
    }

    /// Aggregate statistics over the retained history.
    pub fn metrics(&self) -> TrackerMetrics {
        let history = self.lock_history();
        let total = history.len();
        let successful = history
            .iter()
            .filter(|c| c.status == ExecutionStatus::Completed)
            .count();
        let failed = history
            .iter()
            .filter(|c| c.status == ExecutionStatus::Failed)
            .count();

        let (success_rate, average_duration_ms) = if total > 0 {
            let sum: i64 = history
                .iter()
                .map(|c| c.end_time.map(|end| (end - c.start_time).num_milliseconds()).unwrap_or(0))
                .sum();
            (
                successful as f64 / total as f64 * 100.0,
                (sum as f64 / total as f64).round() as i64,
            )
        } else {
            (0.0, 0)
        };

        TrackerMetrics {
            total_executions: total,
            active_executions: self.inner.active.len(),
            successful_executions: successful,
            failed_executions: failed,
            success_rate,
            average_duration_ms,
        }
    }

    /// Drop all finished executions.  Returns how many were removed.
    pub fn clear_history(&self) -> usize {
        let mut history = self.lock_history();
        let removed = history.len();
        history.clear();
        tracing::info!(removed, "execution history cleared");
        removed
    }

    fn lock_history(&self) -> MutexGuard<'_, VecDeque<ExecutionContext>> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
