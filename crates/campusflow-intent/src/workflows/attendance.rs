//! Low-attendance notification and critical-attendance intervention.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use campusflow_adapters::Student;
use campusflow_kernel::privacy::hash_student_id;

use crate::error::Result;
use crate::registry::steps::*;
use crate::workflows::Run;

const ACTION_NOTIFY: &str = "NOTIFY_LOW_ATTENDANCE";
const ACTION_FALLBACK: &str = "NOTIFICATION_FAILED_FALLBACK_LOGGED";
const ACTION_INTERVENTION: &str = "CRITICAL_ATTENDANCE_INTERVENTION";

/// Warning count above which a low-attendance student also gets a meeting.
pub const REPEAT_DEFAULTER_WARNINGS: u32 = 1;

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Per-student notification outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentNotice {
    pub name: String,
    pub attendance: f64,
    pub notified: bool,
    pub message_sid: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowAttendanceSummary {
    pub threshold: f64,
    pub affected_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub meetings_scheduled: Vec<ScheduledMeeting>,
    pub blockchain_tx_hashes: Vec<String>,
    pub proof: Option<String>,
    pub details: Vec<StudentNotice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMeeting {
    pub student: String,
    pub meeting_link: String,
    pub scheduled_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalSummary {
    pub threshold: f64,
    pub critical_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub meetings_scheduled: Vec<ScheduledMeeting>,
    pub administrators_notified: usize,
    pub blockchain_tx_hashes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Message templates
// ---------------------------------------------------------------------------

pub fn low_attendance_message(attendance: f64, threshold: f64) -> String {
    format!(
        "Alert: Your attendance is {attendance}%, which is below the {threshold}% threshold. \
         Please contact administration."
    )
}

pub fn urgent_message(attendance: f64, threshold: f64) -> String {
    format!(
        "URGENT: Your attendance is {attendance}%, critically below the required {threshold}%. \
         An intervention meeting is being scheduled. Please contact administration immediately."
    )
}

pub fn admin_summary(threshold: f64, students: &[Student], meetings: usize) -> String {
    let names: Vec<&str> = students.iter().map(|s| s.name.as_str()).collect();
    format!(
        "Critical attendance alert: {} student(s) below {threshold}%: {}. Meetings scheduled: {meetings}.",
        students.len(),
        names.join(", ")
    )
}

// ---------------------------------------------------------------------------
// Shared steps
// ---------------------------------------------------------------------------

async fn fetch_below(run: &Run<'_>, step_id: &str) -> Result<Vec<Student>> {
    let students = run
        .services
        .store
        .students_below(run.threshold)
        .await
        .map_err(|e| run.fail(step_id, e))?;

    run.completed(
        step_id,
        json!({ "threshold": run.threshold, "count": students.len() }),
    )?;
    Ok(students)
}

fn hash_ids(run: &Run<'_>, students: &[Student]) -> Result<()> {
    let hashes: Vec<String> = students
        .iter()
        .map(|s| hash_student_id(&s.id.to_string()))
        .collect();
    run.completed(
        HASH_STUDENT_IDS,
        json!({ "hashed": hashes.len(), "algorithm": "sha256" }),
    )
}

/// Send one message per student.  A failed send writes a fallback log row
/// and is counted; it does not abort.
async fn notify_each<F>(
    run: &Run<'_>,
    step_id: &str,
    students: &[Student],
    template: F,
) -> Result<Vec<StudentNotice>>
where
    F: Fn(&Student) -> String,
{
    let mut notices = Vec::with_capacity(students.len());

    for student in students {
        match run.services.messenger.send(&student.phone, &template(student)).await {
            Ok(receipt) => notices.push(StudentNotice {
                name: student.name.clone(),
                attendance: student.attendance,
                notified: true,
                message_sid: Some(receipt.sid),
                error: None,
            }),
            Err(e) => {
                warn!(
                    execution_id = %run.execution_id,
                    student = %student.name,
                    error = %e,
                    "notification failed, writing fallback log"
                );
                run.log_action(step_id, &student.id.to_string(), ACTION_FALLBACK, None)
                    .await?;
                notices.push(StudentNotice {
                    name: student.name.clone(),
                    attendance: student.attendance,
                    notified: false,
                    message_sid: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let sent = notices.iter().filter(|n| n.notified).count();
    run.completed(
        step_id,
        json!({ "sent": sent, "failed": notices.len() - sent }),
    )?;
    Ok(notices)
}

/// Book one meeting per student at the run's meeting time.  A failed booking
/// is counted; it does not abort.
async fn schedule_each(run: &Run<'_>, students: &[&Student]) -> Result<Vec<ScheduledMeeting>> {
    let mut meetings = Vec::with_capacity(students.len());
    let mut failures = 0;

    for student in students {
        match run
            .services
            .calendar
            .schedule_meeting(&student.name, run.meeting_time)
            .await
        {
            Ok(meeting) => meetings.push(ScheduledMeeting {
                student: student.name.clone(),
                meeting_link: meeting.meeting_link,
                scheduled_time: meeting.scheduled_time,
            }),
            Err(e) => {
                warn!(execution_id = %run.execution_id, student = %student.name, error = %e, "meeting not scheduled");
                failures += 1;
            }
        }
    }

    run.completed(
        SCHEDULE_MEETINGS,
        json!({
            "scheduled": meetings.len(),
            "failures": failures,
            "students": meetings.iter().map(|m| m.student.as_str()).collect::<Vec<_>>(),
        }),
    )?;
    Ok(meetings)
}

/// Whether a low-attendance student also gets a meeting.
fn needs_meeting(student: &Student, requested: bool) -> bool {
    requested || student.warnings > REPEAT_DEFAULTER_WARNINGS
}

// ---------------------------------------------------------------------------
// Low attendance
// ---------------------------------------------------------------------------

pub async fn low_attendance(run: &Run<'_>) -> Result<serde_json::Value> {
    let students = fetch_below(run, FETCH_STUDENTS).await?;

    let ledger = run
        .record_on_ledger(
            LOG_BLOCKCHAIN,
            ACTION_NOTIFY,
            students.iter().map(|s| s.id.to_string()),
        )
        .await?;

    hash_ids(run, &students)?;

    let at_risk: Vec<Student> = students
        .into_iter()
        .filter(|s| s.attendance < run.threshold)
        .collect();
    run.completed(
        FILTER_AT_RISK,
        json!({ "atRisk": at_risk.len(), "condition": format!("attendance < {}", run.threshold) }),
    )?;

    let threshold = run.threshold;
    let details = notify_each(run, SEND_NOTIFICATIONS, &at_risk, |s| {
        low_attendance_message(s.attendance, threshold)
    })
    .await?;

    let to_meet: Vec<&Student> = at_risk
        .iter()
        .filter(|s| needs_meeting(s, run.schedule_meeting))
        .collect();
    let meetings = if to_meet.is_empty() {
        run.skipped(SCHEDULE_MEETINGS, "no repeat defaulters and no meeting requested")?;
        Vec::new()
    } else {
        schedule_each(run, &to_meet).await?
    };

    let mut logged = 0;
    for (student, notice) in at_risk.iter().zip(&details) {
        if notice.notified {
            let id = student.id.to_string();
            run.log_action(LOG_DATABASE, &id, ACTION_NOTIFY, ledger.tx_for(&id))
                .await?;
            logged += 1;
        }
    }
    run.completed(LOG_DATABASE, json!({ "entries": logged }))?;

    let proof = run
        .tracker
        .snapshot_proof(run.execution_id)
        .map_err(|e| run.fail(GENERATE_PROOF, e))?;
    run.completed(
        GENERATE_PROOF,
        json!({ "proof": proof.proof, "stepCount": proof.step_count }),
    )?;

    let success_count = details.iter().filter(|d| d.notified).count();
    let summary = LowAttendanceSummary {
        threshold,
        affected_count: at_risk.len(),
        success_count,
        failure_count: details.len() - success_count,
        meetings_scheduled: meetings,
        blockchain_tx_hashes: ledger.hashes(),
        proof: Some(proof.proof),
        details,
    };

    info!(
        execution_id = %run.execution_id,
        affected = summary.affected_count,
        notified = summary.success_count,
        meetings = summary.meetings_scheduled.len(),
        "low attendance workflow finished"
    );
    Ok(serde_json::to_value(summary)?)
}

// ---------------------------------------------------------------------------
// Critical attendance
// ---------------------------------------------------------------------------

pub async fn critical_attendance(run: &Run<'_>) -> Result<serde_json::Value> {
    let students = fetch_below(run, FETCH_CRITICAL_STUDENTS).await?;

    let ledger = run
        .record_on_ledger(
            LOG_BLOCKCHAIN,
            ACTION_INTERVENTION,
            students.iter().map(|s| s.id.to_string()),
        )
        .await?;

    hash_ids(run, &students)?;

    let threshold = run.threshold;
    let notices = notify_each(run, SEND_URGENT_NOTIFICATIONS, &students, |s| {
        urgent_message(s.attendance, threshold)
    })
    .await?;

    let meetings = if students.is_empty() {
        run.skipped(SCHEDULE_MEETINGS, "no students below threshold")?;
        Vec::new()
    } else {
        let all: Vec<&Student> = students.iter().collect();
        schedule_each(run, &all).await?
    };

    let mut administrators_notified = 0;
    if students.is_empty() {
        run.skipped(NOTIFY_ADMINISTRATORS, "no critical students")?;
    } else if run.admin_contacts.is_empty() {
        run.skipped(NOTIFY_ADMINISTRATORS, "no administrator contacts configured")?;
    } else {
        let body = admin_summary(threshold, &students, meetings.len());
        for contact in run.admin_contacts {
            match run.services.messenger.send(contact, &body).await {
                Ok(_) => administrators_notified += 1,
                Err(e) => {
                    warn!(execution_id = %run.execution_id, contact = %contact, error = %e, "administrator not notified");
                }
            }
        }
        run.completed(
            NOTIFY_ADMINISTRATORS,
            json!({
                "notified": administrators_notified,
                "failed": run.admin_contacts.len() - administrators_notified,
            }),
        )?;
    }

    for student in &students {
        let id = student.id.to_string();
        run.log_action(LOG_DATABASE, &id, ACTION_INTERVENTION, ledger.tx_for(&id))
            .await?;
    }
    run.completed(LOG_DATABASE, json!({ "entries": students.len() }))?;

    let success_count = notices.iter().filter(|n| n.notified).count();
    let summary = CriticalSummary {
        threshold,
        critical_count: students.len(),
        success_count,
        failure_count: notices.len() - success_count,
        meetings_scheduled: meetings,
        administrators_notified,
        blockchain_tx_hashes: ledger.hashes(),
    };

    info!(
        execution_id = %run.execution_id,
        critical = summary.critical_count,
        meetings = summary.meetings_scheduled.len(),
        "critical attendance workflow finished"
    );
    Ok(serde_json::to_value(summary)?)
}
