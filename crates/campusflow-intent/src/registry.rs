//! Built-in workflow registry.
//!
//! The registry is a static table of the four university workflows.  Each
//! entry is keyed by a [`WorkflowKind`], which the executor uses to dispatch
//! to the matching hand-written workflow function.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use campusflow_kernel::{ServiceKind, StepDescriptor, TriggerKind, WorkflowDefinition};

// ---------------------------------------------------------------------------
// Step ids
// ---------------------------------------------------------------------------

pub mod steps {
    //! Step identifiers shared by the definitions and the workflow code.

    pub const FETCH_STUDENTS: &str = "FETCH_STUDENTS";
    pub const FETCH_CRITICAL_STUDENTS: &str = "FETCH_CRITICAL_STUDENTS";
    pub const FETCH_ASSIGNMENTS: &str = "FETCH_ASSIGNMENTS";
    pub const FETCH_PERFORMANCE_DATA: &str = "FETCH_PERFORMANCE_DATA";

    pub const LOG_BLOCKCHAIN: &str = "LOG_BLOCKCHAIN";
    pub const BLOCKCHAIN_AUDIT: &str = "BLOCKCHAIN_AUDIT";
    pub const BLOCKCHAIN_RECORD: &str = "BLOCKCHAIN_RECORD";

    pub const HASH_STUDENT_IDS: &str = "HASH_STUDENT_IDS";
    pub const FILTER_AT_RISK: &str = "FILTER_AT_RISK";
    pub const IDENTIFY_INCOMPLETE: &str = "IDENTIFY_INCOMPLETE";
    pub const ANALYZE_PATTERNS: &str = "ANALYZE_PATTERNS";
    pub const GENERATE_REPORTS: &str = "GENERATE_REPORTS";

    pub const SEND_NOTIFICATIONS: &str = "SEND_NOTIFICATIONS";
    pub const SEND_URGENT_NOTIFICATIONS: &str = "SEND_URGENT_NOTIFICATIONS";
    pub const NOTIFY_ADMINISTRATORS: &str = "NOTIFY_ADMINISTRATORS";
    pub const SEND_REMINDERS: &str = "SEND_REMINDERS";

    pub const SCHEDULE_MEETINGS: &str = "SCHEDULE_MEETINGS";
    pub const UPDATE_CALENDAR: &str = "UPDATE_CALENDAR";
    pub const SCHEDULE_REVIEWS: &str = "SCHEDULE_REVIEWS";

    pub const LOG_DATABASE: &str = "LOG_DATABASE";
    pub const LOG_ACTIONS: &str = "LOG_ACTIONS";
    pub const LOG_REVIEW: &str = "LOG_REVIEW";

    pub const GENERATE_PROOF: &str = "GENERATE_PROOF";
}

use steps::*;

// ---------------------------------------------------------------------------
// Workflow kinds
// ---------------------------------------------------------------------------

/// The workflows this system knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowKind {
    LowAttendance,
    CriticalAttendance,
    AssignmentTracking,
    PerformanceReview,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 4] = [
        Self::LowAttendance,
        Self::CriticalAttendance,
        Self::AssignmentTracking,
        Self::PerformanceReview,
    ];

    /// Stable workflow id.
    pub fn id(self) -> &'static str {
        match self {
            Self::LowAttendance => "attendance_low_75",
            Self::CriticalAttendance => "attendance_critical_60",
            Self::AssignmentTracking => "assignment_tracking",
            Self::PerformanceReview => "performance_review",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// Attendance threshold used when the command gives none.
    pub fn default_threshold(self) -> Option<u32> {
        match self {
            Self::LowAttendance => Some(75),
            Self::CriticalAttendance => Some(65),
            Self::AssignmentTracking | Self::PerformanceReview => None,
        }
    }

    /// Build the static definition for this kind.
    pub fn definition(self) -> WorkflowDefinition {
        use ServiceKind::*;

        let step = StepDescriptor::new;
        let (name, description, steps, output) = match self {
            Self::LowAttendance => (
                "Low Attendance Detection & Notification",
                "Detect students below 75% attendance and send notifications",
                vec![
                    step(FETCH_STUDENTS, DataStore, "Fetch student records below the threshold"),
                    step(LOG_BLOCKCHAIN, Ledger, "Emit immutable audit event on-chain"),
                    step(HASH_STUDENT_IDS, Privacy, "Generate privacy-preserving hashes for student IDs"),
                    step(FILTER_AT_RISK, Logic, "Filter students at risk")
                        .with_condition("attendance < threshold, default 75"),
                    step(SEND_NOTIFICATIONS, Messaging, "Send WhatsApp notifications to students"),
                    step(SCHEDULE_MEETINGS, Calendar, "Schedule meetings with repeat defaulters")
                        .with_condition("warnings > 1 or meeting requested"),
                    step(LOG_DATABASE, DataStore, "Log notification action to database"),
                    step(GENERATE_PROOF, Privacy, "Generate execution proof"),
                ],
                "WorkflowExecutionSummary",
            ),
            Self::CriticalAttendance => (
                "Critical Attendance Intervention",
                "Handle students below 65% attendance with escalated intervention",
                vec![
                    step(FETCH_CRITICAL_STUDENTS, DataStore, "Fetch students with critical attendance"),
                    step(LOG_BLOCKCHAIN, Ledger, "Record intervention on the ledger"),
                    step(HASH_STUDENT_IDS, Privacy, "Generate privacy hashes"),
                    step(SEND_URGENT_NOTIFICATIONS, Messaging, "Send urgent WhatsApp notifications"),
                    step(SCHEDULE_MEETINGS, Calendar, "Schedule intervention meetings")
                        .with_condition("attendance < threshold, default 65"),
                    step(NOTIFY_ADMINISTRATORS, Messaging, "Alert administrators about critical cases"),
                    step(LOG_DATABASE, DataStore, "Log intervention action"),
                ],
                "InterventionSummary",
            ),
            Self::AssignmentTracking => (
                "Assignment Completion Tracking",
                "Track and notify students with incomplete assignments",
                vec![
                    step(FETCH_ASSIGNMENTS, DataStore, "Fetch assignment completion data"),
                    step(BLOCKCHAIN_AUDIT, Ledger, "Create audit trail"),
                    step(IDENTIFY_INCOMPLETE, Logic, "Identify students with incomplete work")
                        .with_condition("completed < total"),
                    step(SEND_REMINDERS, Messaging, "Send assignment reminders"),
                    step(UPDATE_CALENDAR, Calendar, "Add deadline reminders to calendars"),
                    step(LOG_ACTIONS, DataStore, "Log reminder actions"),
                ],
                "AssignmentSummary",
            ),
            Self::PerformanceReview => (
                "Student Performance Review",
                "Comprehensive student performance analysis and reporting",
                vec![
                    step(FETCH_PERFORMANCE_DATA, DataStore, "Gather all performance metrics"),
                    step(BLOCKCHAIN_RECORD, Ledger, "Immutable performance record"),
                    step(ANALYZE_PATTERNS, Logic, "Identify performance patterns and trends"),
                    step(GENERATE_REPORTS, Logic, "Create performance reports"),
                    step(SCHEDULE_REVIEWS, Calendar, "Schedule performance review meetings"),
                    step(LOG_REVIEW, DataStore, "Record review initiation"),
                ],
                "PerformanceReviewSummary",
            ),
        };

        WorkflowDefinition {
            id: self.id().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            trigger: TriggerKind::NaturalLanguage,
            steps,
            output: output.to_string(),
        }
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Summary of a workflow for listings and for the interpreter's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowListing {
    pub id: String,
    pub name: String,
    pub description: String,
    pub step_count: usize,
    pub integrations: Vec<ServiceKind>,
}

/// Static table of workflow definitions.
pub struct WorkflowRegistry {
    entries: Vec<(WorkflowKind, Arc<WorkflowDefinition>)>,
}

impl WorkflowRegistry {
    /// The four built-in university workflows.
    pub fn builtin() -> Self {
        Self {
            entries: WorkflowKind::ALL
                .into_iter()
                .map(|kind| (kind, Arc::new(kind.definition())))
                .collect(),
        }
    }

    /// Look up a workflow by id or by display name.
    pub fn get(&self, identifier: &str) -> Option<Arc<WorkflowDefinition>> {
        self.resolve(identifier).map(|(_, def)| def)
    }

    /// Look up a workflow and the kind that implements it.
    pub fn resolve(&self, identifier: &str) -> Option<(WorkflowKind, Arc<WorkflowDefinition>)> {
        self.entries
            .iter()
            .find(|(_, def)| def.id == identifier || def.name == identifier)
            .map(|(kind, def)| (*kind, Arc::clone(def)))
    }

    pub fn list(&self) -> Vec<WorkflowListing> {
        self.entries
            .iter()
            .map(|(_, def)| WorkflowListing {
                id: def.id.clone(),
                name: def.name.clone(),
                description: def.description.clone(),
                step_count: def.steps.len(),
                integrations: def.integrations(),
            })
            .collect()
    }

    /// Mermaid diagram for a workflow, if it exists.
    pub fn mermaid(&self, identifier: &str) -> Option<String> {
        self.get(identifier).map(|def| def.mermaid())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
