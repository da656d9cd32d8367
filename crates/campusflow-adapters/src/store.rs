//! In-memory data store.
//!
//! Holds the `students`, `assignments`, and `logs` tables in process memory.
//! It can be seeded from a JSON file shaped like:
//!
//! ```json
//! {
//!   "students":    [{"id": 1, "name": "Asha", "attendance": 62.5, "phone": "+15550001", "warnings": 2}],
//!   "assignments": [{"id": 1, "student_id": 1, "title": "Lab 3", "completed": 1, "total": 3, "due_date": "Friday 5pm"}]
//! }
//! ```
//!
//! or from the built-in demo roster via [`InMemoryDataStore::demo`].

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{AdapterError, Result};
use crate::traits::{Assignment, DataStore, LogEntry, NewLogEntry, Student};

/// Initial table contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

impl Seed {
    /// Reject rows no real table would accept.
    fn validate(&self) -> Result<()> {
        for student in &self.students {
            if !(0.0..=100.0).contains(&student.attendance) {
                return Err(AdapterError::InvalidInput(format!(
                    "student {} has attendance {} outside 0..=100",
                    student.id, student.attendance
                )));
            }
        }
        for assignment in &self.assignments {
            if assignment.completed > assignment.total {
                return Err(AdapterError::InvalidInput(format!(
                    "assignment {} has completed {} > total {}",
                    assignment.id, assignment.completed, assignment.total
                )));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct Tables {
    students: Vec<Student>,
    assignments: Vec<Assignment>,
    logs: Vec<LogEntry>,
    next_log_id: i64,
}

/// [`DataStore`] backed by process memory.
pub struct InMemoryDataStore {
    tables: RwLock<Tables>,
}

impl InMemoryDataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::from_seed_unchecked(Seed::default())
    }

    /// Create a store pre-filled with `seed`.
    pub fn from_seed(seed: Seed) -> Result<Self> {
        seed.validate()?;
        Ok(Self::from_seed_unchecked(seed))
    }

    /// Load a JSON seed file.
    pub async fn from_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let seed: Seed = serde_json::from_str(&raw)?;
        info!(
            path = %path.display(),
            students = seed.students.len(),
            assignments = seed.assignments.len(),
            "data store seeded from file"
        );
        Self::from_seed(seed)
    }

    /// A small roster covering every workflow branch.
    pub fn demo() -> Self {
        Self::from_seed_unchecked(demo_seed())
    }

    fn from_seed_unchecked(seed: Seed) -> Self {
        Self {
            tables: RwLock::new(Tables {
                students: seed.students,
                assignments: seed.assignments,
                logs: Vec::new(),
                next_log_id: 1,
            }),
        }
    }
}

impl Default for InMemoryDataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn students_below(&self, threshold: f64) -> Result<Vec<Student>> {
        let tables = self.tables.read().await;
        let rows: Vec<Student> = tables
            .students
            .iter()
            .filter(|s| s.attendance < threshold)
            .cloned()
            .collect();
        debug!(threshold, rows = rows.len(), "students below threshold");
        Ok(rows)
    }

    async fn students(&self) -> Result<Vec<Student>> {
        let mut rows = self.tables.read().await.students.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn assignments(&self) -> Result<Vec<Assignment>> {
        Ok(self.tables.read().await.assignments.clone())
    }

    async fn insert_log(&self, entry: NewLogEntry) -> Result<LogEntry> {
        if entry.action.trim().is_empty() {
            return Err(AdapterError::InvalidInput("log action is empty".into()));
        }

        let mut tables = self.tables.write().await;
        let row = LogEntry {
            id: tables.next_log_id,
            timestamp: Utc::now(),
            student_hash: entry.student_hash,
            action: entry.action,
            tx_hash: entry.tx_hash,
            execution_id: entry.execution_id,
        };
        tables.next_log_id += 1;
        tables.logs.push(row.clone());

        debug!(log_id = row.id, action = %row.action, "log row inserted");
        Ok(row)
    }

    async fn logs(&self) -> Result<Vec<LogEntry>> {
        let tables = self.tables.read().await;
        // Ids grow with insertion order, so this is newest first even when
        // two rows share a timestamp.
        let mut rows = tables.logs.clone();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }
}

/// The built-in demo roster.
pub fn demo_seed() -> Seed {
    let student = |id: i64, name: &str, attendance: f64, phone: &str, warnings: u32| Student {
        id,
        name: name.to_string(),
        attendance,
        phone: phone.to_string(),
        warnings,
    };
    let assignment =
        |id: i64, student_id: i64, title: &str, completed: u32, total: u32, due: Option<&str>| {
            Assignment {
                id,
                student_id,
                title: title.to_string(),
                completed,
                total,
                due_date: due.map(str::to_string),
            }
        };

    Seed {
        students: vec![
            student(1, "Aarav Mehta", 58.0, "+15550100001", 3),
            student(2, "Bianca Rossi", 71.5, "+15550100002", 1),
            student(3, "Chen Wei", 92.0, "+15550100003", 0),
            student(4, "Dana Okafor", 63.0, "+15550100004", 2),
            student(5, "Elif Yilmaz", 84.0, "+15550100005", 0),
        ],
        assignments: vec![
            assignment(1, 1, "Data Structures Lab 4", 1, 3, Some("Friday 5pm")),
            assignment(2, 2, "Linear Algebra Set 6", 4, 5, Some("Monday 9am")),
            assignment(3, 3, "Operating Systems Essay", 1, 1, None),
            assignment(4, 4, "Networks Project", 0, 2, None),
            assignment(5, 5, "Compilers Parser", 2, 2, Some("Thursday 11am")),
            assignment(6, 2, "Databases Quiz Prep", 3, 3, None),
        ],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
