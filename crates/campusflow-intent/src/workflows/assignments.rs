//! Assignment completion tracking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use campusflow_adapters::{Assignment, Student};

use crate::error::Result;
use crate::registry::steps::*;
use crate::workflows::Run;

const ACTION_AUDIT: &str = "ASSIGNMENT_AUDIT";
const ACTION_REMINDER: &str = "ASSIGNMENT_REMINDER_SENT";
/// Ledger subject for the whole-roster audit record.
const AUDIT_SUBJECT: &str = "ALL_STUDENTS";

/// A student and their unfinished assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReminder {
    pub student_id: i64,
    pub name: String,
    pub titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    pub incomplete_count: usize,
    pub students_reminded: Vec<String>,
    pub reminders_sent: usize,
    pub reminder_failures: usize,
    pub calendar_events_created: usize,
    pub blockchain_tx_hashes: Vec<String>,
}

pub fn reminder_message(titles: &[String]) -> String {
    format!(
        "Reminder: you have {} incomplete assignment(s): {}. Please complete them before the deadline.",
        titles.len(),
        titles.join(", ")
    )
}

/// Group incomplete assignments by student, in student id order.  Assignments
/// whose student is unknown are dropped.
pub fn pending_by_student(assignments: &[Assignment], students: &[Student]) -> Vec<PendingReminder> {
    let mut grouped: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for assignment in assignments.iter().filter(|a| a.is_incomplete()) {
        grouped
            .entry(assignment.student_id)
            .or_default()
            .push(assignment.title.clone());
    }

    grouped
        .into_iter()
        .filter_map(|(student_id, titles)| {
            students
                .iter()
                .find(|s| s.id == student_id)
                .map(|s| PendingReminder {
                    student_id,
                    name: s.name.clone(),
                    titles,
                })
        })
        .collect()
}

pub async fn assignment_tracking(run: &Run<'_>) -> Result<serde_json::Value> {
    let store = &run.services.store;
    let assignments = store
        .assignments()
        .await
        .map_err(|e| run.fail(FETCH_ASSIGNMENTS, e))?;
    let students = store
        .students()
        .await
        .map_err(|e| run.fail(FETCH_ASSIGNMENTS, e))?;
    run.completed(
        FETCH_ASSIGNMENTS,
        json!({ "assignments": assignments.len(), "students": students.len() }),
    )?;

    let audit = run
        .record_on_ledger(BLOCKCHAIN_AUDIT, ACTION_AUDIT, [AUDIT_SUBJECT.to_string()])
        .await?;
    let audit_tx = audit.tx_for(AUDIT_SUBJECT);

    let incomplete: Vec<&Assignment> = assignments.iter().filter(|a| a.is_incomplete()).collect();
    let pending = pending_by_student(&assignments, &students);
    run.completed(
        IDENTIFY_INCOMPLETE,
        json!({ "incompleteAssignments": incomplete.len(), "students": pending.len() }),
    )?;

    let mut reminded = Vec::new();
    let mut reminder_failures = 0;
    for reminder in &pending {
        let Some(student) = students.iter().find(|s| s.id == reminder.student_id) else {
            continue;
        };
        match run
            .services
            .messenger
            .send(&student.phone, &reminder_message(&reminder.titles))
            .await
        {
            Ok(_) => reminded.push(reminder),
            Err(e) => {
                warn!(execution_id = %run.execution_id, student = %student.name, error = %e, "reminder failed");
                reminder_failures += 1;
            }
        }
    }
    run.completed(
        SEND_REMINDERS,
        json!({ "sent": reminded.len(), "failed": reminder_failures }),
    )?;

    let mut events_created = 0;
    let mut event_failures = 0;
    for assignment in &incomplete {
        let Some(due) = assignment.due_date.as_deref() else {
            continue;
        };
        let Some(student) = students.iter().find(|s| s.id == assignment.student_id) else {
            continue;
        };
        match run.services.calendar.schedule_meeting(&student.name, due).await {
            Ok(_) => events_created += 1,
            Err(e) => {
                warn!(execution_id = %run.execution_id, assignment = %assignment.title, error = %e, "deadline event not created");
                event_failures += 1;
            }
        }
    }
    run.completed(
        UPDATE_CALENDAR,
        json!({ "eventsCreated": events_created, "failures": event_failures }),
    )?;

    for reminder in &reminded {
        run.log_action(
            LOG_ACTIONS,
            &reminder.student_id.to_string(),
            ACTION_REMINDER,
            audit_tx.clone(),
        )
        .await?;
    }
    run.completed(LOG_ACTIONS, json!({ "entries": reminded.len() }))?;

    let summary = AssignmentSummary {
        incomplete_count: incomplete.len(),
        students_reminded: reminded.iter().map(|r| r.name.clone()).collect(),
        reminders_sent: reminded.len(),
        reminder_failures,
        calendar_events_created: events_created,
        blockchain_tx_hashes: audit.hashes(),
    };

    info!(
        execution_id = %run.execution_id,
        incomplete = summary.incomplete_count,
        reminded = summary.reminders_sent,
        "assignment tracking workflow finished"
    );
    Ok(serde_json::to_value(summary)?)
}
