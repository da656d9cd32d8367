//! Execution records.
//!
//! An [`ExecutionContext`] tracks one run of a workflow: its id, status,
//! ordered step logs, start and end time, final outcome, and proof.  The
//! [`ExecutionView`] and [`WorkflowProgress`] types are read-only projections
//! shaped for a dashboard.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::definition::{ServiceKind, TriggerKind, WorkflowDefinition};

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Lifecycle state of an execution.
///
/// The only legal transitions are `Running -> Completed` and
/// `Running -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of a single logged step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    #[default]
    Completed,
    Failed,
    /// The step's guard did not hold; nothing was done.
    Skipped,
}

/// Status of a definition step in a [`WorkflowProgress`] view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    Pending,
    Completed,
    Failed,
    Skipped,
}

impl From<StepStatus> for ProgressStatus {
    fn from(status: StepStatus) -> Self {
        match status {
            StepStatus::Completed => Self::Completed,
            StepStatus::Failed => Self::Failed,
            StepStatus::Skipped => Self::Skipped,
        }
    }
}

// ---------------------------------------------------------------------------
// Step logs
// ---------------------------------------------------------------------------

/// What a workflow reports when it logs a step.
#[derive(Debug, Clone, Default)]
pub struct StepRecord {
    pub status: StepStatus,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

impl StepRecord {
    /// A completed step carrying `data`.
    pub fn completed(data: serde_json::Value) -> Self {
        Self {
            status: StepStatus::Completed,
            data,
            error: None,
        }
    }

    /// A failed step with an error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Failed,
            data: serde_json::Value::Object(Default::default()),
            error: Some(error.into()),
        }
    }

    /// A skipped step with the reason it was skipped.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Skipped,
            data: serde_json::json!({ "reason": reason.into() }),
            error: None,
        }
    }
}

/// One entry in an execution's ordered step log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub status: StepStatus,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Outcome and proof
// ---------------------------------------------------------------------------

/// The final result an execution is completed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Decides the terminal status: `Completed` when true, `Failed` otherwise.
    pub success: bool,
    /// Workflow-specific summary.
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }
}

/// Hash-chain integrity marker over an execution's step logs.
///
/// This is a cosmetic marker for the dashboard, not a cryptographic
/// commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionProof {
    /// Lowercase hex SHA-256 root.
    pub proof: String,
    pub step_count: usize,
    pub algorithm: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

/// The full record of one workflow run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: Uuid,
    pub workflow: Arc<WorkflowDefinition>,
    pub trigger: TriggerKind,
    pub metadata: serde_json::Value,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub steps: Vec<StepLog>,
    pub result: Option<ExecutionOutcome>,
    pub proof: Option<ExecutionProof>,
}

impl ExecutionContext {
    /// Open a new `Running` context with a fresh id.
    pub fn open(
        workflow: Arc<WorkflowDefinition>,
        trigger: TriggerKind,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            execution_id: Uuid::now_v7(),
            workflow,
            trigger,
            metadata,
            status: ExecutionStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            steps: Vec::new(),
            result: None,
            proof: None,
        }
    }

    /// Append a step log.  Logs are kept in call order.
    pub fn push_step(&mut self, step_id: impl Into<String>, record: StepRecord) -> StepLog {
        let step = StepLog {
            id: step_id.into(),
            timestamp: Utc::now(),
            status: record.status,
            data: record.data,
            error: record.error,
        };
        self.steps.push(step.clone());
        step
    }

    /// Finalize the context with `outcome`.
    pub fn finish(&mut self, outcome: ExecutionOutcome) {
        self.status = if outcome.success {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        self.end_time = Some(Utc::now());
        self.result = Some(outcome);
    }

    /// Milliseconds from start to end, or to `now` while still running.
    pub fn duration_ms(&self, now: DateTime<Utc>) -> i64 {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).num_milliseconds()
    }

    /// Project this context into a dashboard view.
    pub fn view(&self, is_active: bool) -> ExecutionView {
        let steps = self
            .steps
            .iter()
            .map(|step| {
                let descriptor = self.workflow.step(&step.id);
                StepView {
                    id: step.id.clone(),
                    service: descriptor.map(|d| d.service),
                    description: descriptor.map(|d| d.description.clone()),
                    status: step.status,
                    timestamp: step.timestamp,
                    data: step.data.clone(),
                    error: step.error.clone(),
                }
            })
            .collect();

        ExecutionView {
            execution_id: self.execution_id,
            workflow_name: self.workflow.name.clone(),
            workflow_id: self.workflow.id.clone(),
            trigger: self.trigger,
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_ms: self.duration_ms(Utc::now()),
            steps,
            result: self.result.clone(),
            proof: self.proof.clone(),
            metadata: self.metadata.clone(),
            is_active,
        }
    }

    /// The definition's steps annotated with what has been logged so far.
    ///
    /// Logged steps are matched to definition steps by id; definition steps
    /// with no log yet are `Pending`.
    pub fn progress(&self) -> WorkflowProgress {
        let steps = self
            .workflow
            .steps
            .iter()
            .map(|descriptor| {
                let logged = self.steps.iter().rev().find(|s| s.id == descriptor.id);
                ProgressStep {
                    id: descriptor.id.clone(),
                    service: descriptor.service,
                    description: descriptor.description.clone(),
                    condition: descriptor.condition.clone(),
                    status: logged
                        .map(|s| ProgressStatus::from(s.status))
                        .unwrap_or(ProgressStatus::Pending),
                    executed_at: logged.map(|s| s.timestamp),
                    error: logged.and_then(|s| s.error.clone()),
                }
            })
            .collect();

        WorkflowProgress {
            name: self.workflow.name.clone(),
            execution_id: self.execution_id,
            trigger: self.trigger,
            steps,
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A logged step joined with its definition descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub id: String,
    pub service: Option<ServiceKind>,
    pub description: Option<String>,
    pub status: StepStatus,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

/// Dashboard projection of an [`ExecutionContext`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionView {
    pub execution_id: Uuid,
    pub workflow_name: String,
    pub workflow_id: String,
    pub trigger: TriggerKind,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: i64,
    pub steps: Vec<StepView>,
    pub result: Option<ExecutionOutcome>,
    pub proof: Option<ExecutionProof>,
    pub metadata: serde_json::Value,
    pub is_active: bool,
}

/// A definition step with its execution state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStep {
    pub id: String,
    pub service: ServiceKind,
    pub description: String,
    pub condition: Option<String>,
    pub status: ProgressStatus,
    pub executed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Every definition step of an execution, including the ones not reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowProgress {
    pub name: String,
    pub execution_id: Uuid,
    pub trigger: TriggerKind,
    pub steps: Vec<ProgressStep>,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
