//! Collaborator traits and the records they exchange.
//!
//! Workflows never talk to a hosted service directly; they go through one of
//! four narrow contracts:
//!
//! | Trait | Backing service in production | Shipped implementation |
//! |-------|-------------------------------|------------------------|
//! | [`DataStore`] | Postgres-backed REST store | [`crate::InMemoryDataStore`] |
//! | [`Messenger`] | WhatsApp / SMS provider | [`crate::MockMessenger`] |
//! | [`Calendar`] | Calendar with video links | [`crate::MockCalendar`] |
//! | [`Ledger`] | Audit-log smart contract | [`crate::MockLedger`] |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Data store records
// ---------------------------------------------------------------------------

/// A row of the `students` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    /// Attendance percentage, `0.0..=100.0`.
    pub attendance: f64,
    pub phone: String,
    /// Number of prior attendance warnings.
    #[serde(default)]
    pub warnings: u32,
}

/// A row of the `assignments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub student_id: i64,
    pub title: String,
    /// Completed parts of the assignment.
    pub completed: u32,
    /// Total parts of the assignment.
    pub total: u32,
    #[serde(default)]
    pub due_date: Option<String>,
}

impl Assignment {
    pub fn is_incomplete(&self) -> bool {
        self.completed < self.total
    }
}

/// A row to insert into the `logs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLogEntry {
    /// Hashed student id (see `campusflow_kernel::privacy`).
    pub student_hash: String,
    pub action: String,
    pub tx_hash: Option<String>,
    pub execution_id: Option<Uuid>,
}

/// A stored row of the `logs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub student_hash: String,
    pub action: String,
    pub tx_hash: Option<String>,
    pub execution_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Provider receipts
// ---------------------------------------------------------------------------

/// Acknowledgement from the messaging provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    /// Provider message id.
    pub sid: String,
}

/// A meeting created by the calendar provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub meeting_link: String,
    pub scheduled_time: String,
}

/// A ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: String,
    /// `0x`-prefixed hash of the subject id.
    pub student_hash: String,
    pub execution_id: String,
    pub timestamp: DateTime<Utc>,
    /// True when no real chain was written.
    pub mock: bool,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Student, assignment, and action-log storage.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Students whose attendance is strictly below `threshold`.
    async fn students_below(&self, threshold: f64) -> Result<Vec<Student>>;

    /// All students, ordered by name.
    async fn students(&self) -> Result<Vec<Student>>;

    /// All assignments.
    async fn assignments(&self) -> Result<Vec<Assignment>>;

    /// Append a row to the action log.
    async fn insert_log(&self, entry: NewLogEntry) -> Result<LogEntry>;

    /// The action log, newest first.
    async fn logs(&self) -> Result<Vec<LogEntry>>;
}

/// Outbound notifications.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send `body` to the phone number `to`.
    async fn send(&self, to: &str, body: &str) -> Result<MessageReceipt>;
}

/// Meeting creation.
#[async_trait]
pub trait Calendar: Send + Sync {
    /// Schedule a meeting with `attendee` at the human-readable time `when`.
    async fn schedule_meeting(&self, attendee: &str, when: &str) -> Result<Meeting>;
}

/// Append-only audit ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Record `action` against `subject_id`.  The subject is hashed before it
    /// is written.
    async fn record_action(
        &self,
        subject_id: &str,
        action: &str,
        execution_id: &str,
    ) -> Result<LedgerReceipt>;
}
