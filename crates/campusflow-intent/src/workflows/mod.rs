//! Hand-written workflow bodies.
//!
//! Each workflow is an async function taking a [`Run`], performing a fixed
//! sequence of collaborator calls, logging one step per definition step, and
//! returning its summary as JSON.  A step that cannot continue logs itself as
//! failed through [`Run::fail`] and the error aborts the workflow.

pub mod assignments;
pub mod attendance;
pub mod performance;

use std::fmt::Display;
use std::sync::Arc;

use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use campusflow_adapters::{Calendar, DataStore, Ledger, Messenger, NewLogEntry};
use campusflow_kernel::privacy::hash_student_id;
use campusflow_kernel::{ExecutionTracker, StepRecord};

use crate::error::{IntentError, Result};

pub use assignments::{AssignmentSummary, PendingReminder};
pub use attendance::{CriticalSummary, LowAttendanceSummary, ScheduledMeeting, StudentNotice};
pub use performance::{PerformanceSummary, PerformanceTier, StudentReport};

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// The collaborators a workflow may call.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn DataStore>,
    pub messenger: Arc<dyn Messenger>,
    pub calendar: Arc<dyn Calendar>,
    pub ledger: Arc<dyn Ledger>,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Everything a workflow body needs for one execution.
pub struct Run<'a> {
    pub execution_id: Uuid,
    pub tracker: &'a ExecutionTracker,
    pub services: &'a Services,
    /// Attendance threshold, already defaulted and validated.
    pub threshold: f64,
    /// Meeting time, already defaulted.
    pub meeting_time: &'a str,
    pub schedule_meeting: bool,
    pub admin_contacts: &'a [String],
}

impl Run<'_> {
    pub fn completed(&self, step_id: &str, data: serde_json::Value) -> Result<()> {
        self.tracker
            .log_step(self.execution_id, step_id, StepRecord::completed(data))?;
        Ok(())
    }

    pub fn skipped(&self, step_id: &str, reason: &str) -> Result<()> {
        self.tracker
            .log_step(self.execution_id, step_id, StepRecord::skipped(reason))?;
        Ok(())
    }

    /// Log `step_id` as failed and build the error that aborts the workflow.
    pub fn fail(&self, step_id: &str, error: impl Display) -> IntentError {
        let reason = error.to_string();
        if let Err(e) = self.tracker.log_step(
            self.execution_id,
            step_id,
            StepRecord::failed(reason.clone()),
        ) {
            warn!(execution_id = %self.execution_id, step_id, error = %e, "could not log failed step");
        }
        IntentError::StepFailed {
            step_id: step_id.to_string(),
            reason,
        }
    }

    /// Record `action` on the ledger once per subject and log `step_id` with
    /// the counts.  Ledger failures are counted, not fatal.
    pub async fn record_on_ledger<I>(
        &self,
        step_id: &str,
        action: &str,
        subjects: I,
    ) -> Result<LedgerBatch>
    where
        I: IntoIterator<Item = String>,
    {
        let execution_id = self.execution_id.to_string();
        let mut batch = LedgerBatch::default();

        for subject in subjects {
            match self
                .services
                .ledger
                .record_action(&subject, action, &execution_id)
                .await
            {
                Ok(receipt) => batch.tx_hashes.push((subject, receipt.tx_hash)),
                Err(e) => {
                    warn!(execution_id = %self.execution_id, action, error = %e, "ledger write failed");
                    batch.failures += 1;
                }
            }
        }

        self.completed(
            step_id,
            json!({
                "action": action,
                "transactions": batch.tx_hashes.len(),
                "failures": batch.failures,
                "txHashes": batch.hashes(),
            }),
        )?;
        Ok(batch)
    }

    /// Append a row to the action log for `student_id`.
    pub async fn log_action(
        &self,
        step_id: &str,
        student_id: &str,
        action: &str,
        tx_hash: Option<String>,
    ) -> Result<()> {
        self.services
            .store
            .insert_log(NewLogEntry {
                student_hash: hash_student_id(student_id),
                action: action.to_string(),
                tx_hash,
                execution_id: Some(self.execution_id),
            })
            .await
            .map_err(|e| self.fail(step_id, e))?;
        Ok(())
    }
}

/// Result of [`Run::record_on_ledger`].
#[derive(Debug, Default)]
pub struct LedgerBatch {
    /// `(subject, tx_hash)` in write order.
    pub tx_hashes: Vec<(String, String)>,
    pub failures: usize,
}

impl LedgerBatch {
    pub fn hashes(&self) -> Vec<String> {
        self.tx_hashes.iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn tx_for(&self, subject: &str) -> Option<String> {
        self.tx_hashes
            .iter()
            .find(|(s, _)| s == subject)
            .map(|(_, h)| h.clone())
    }
}
