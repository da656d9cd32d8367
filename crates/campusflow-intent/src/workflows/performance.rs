//! Student performance review.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use campusflow_adapters::{Assignment, Student};

use crate::error::Result;
use crate::registry::steps::*;
use crate::workflows::Run;

const ACTION_REVIEW: &str = "PERFORMANCE_REVIEW";
const ACTION_INITIATED: &str = "PERFORMANCE_REVIEW_INITIATED";

/// Classification of a student's standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceTier {
    AtRisk,
    NeedsAttention,
    OnTrack,
}

impl PerformanceTier {
    /// `completion_rate` is a fraction in `0.0..=1.0`.
    pub fn classify(attendance: f64, completion_rate: f64) -> Self {
        if attendance < 65.0 || completion_rate < 0.5 {
            Self::AtRisk
        } else if attendance < 75.0 || completion_rate < 0.75 {
            Self::NeedsAttention
        } else {
            Self::OnTrack
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student_id: i64,
    pub name: String,
    pub attendance: f64,
    pub assignments_completed: u64,
    pub assignments_total: u64,
    pub completion_rate: f64,
    pub tier: PerformanceTier,
}

impl StudentReport {
    /// Build a report from a student's row and every assignment on record.
    ///
    /// Parts are summed as `u64`; a student may hold any number of `u32`
    /// assignments without overflow.
    pub fn build(student: &Student, assignments: &[Assignment]) -> Self {
        let (completed, total) = assignments
            .iter()
            .filter(|a| a.student_id == student.id)
            .fold((0u64, 0u64), |(c, t), a| {
                (
                    c.saturating_add(u64::from(a.completed)),
                    t.saturating_add(u64::from(a.total)),
                )
            });
        let completion_rate = if total == 0 {
            1.0
        } else {
            completed as f64 / total as f64
        };

        Self {
            student_id: student.id,
            name: student.name.clone(),
            attendance: student.attendance,
            assignments_completed: completed,
            assignments_total: total,
            completion_rate,
            tier: PerformanceTier::classify(student.attendance, completion_rate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub students_reviewed: usize,
    pub report_count: usize,
    pub average_attendance: f64,
    pub at_risk: usize,
    pub needs_attention: usize,
    pub on_track: usize,
    pub meetings_scheduled: Vec<String>,
    pub reports: Vec<StudentReport>,
    pub blockchain_tx_hashes: Vec<String>,
}

fn average_attendance(students: &[Student]) -> f64 {
    if students.is_empty() {
        return 0.0;
    }
    let mean = students.iter().map(|s| s.attendance).sum::<f64>() / students.len() as f64;
    (mean * 10.0).round() / 10.0
}

pub async fn performance_review(run: &Run<'_>) -> Result<serde_json::Value> {
    let store = &run.services.store;
    let students = store
        .students()
        .await
        .map_err(|e| run.fail(FETCH_PERFORMANCE_DATA, e))?;
    let assignments = store
        .assignments()
        .await
        .map_err(|e| run.fail(FETCH_PERFORMANCE_DATA, e))?;
    run.completed(
        FETCH_PERFORMANCE_DATA,
        json!({ "students": students.len(), "assignments": assignments.len() }),
    )?;

    let ledger = run
        .record_on_ledger(
            BLOCKCHAIN_RECORD,
            ACTION_REVIEW,
            students.iter().map(|s| s.id.to_string()),
        )
        .await?;

    let reports: Vec<StudentReport> = students
        .iter()
        .map(|s| StudentReport::build(s, &assignments))
        .collect();
    let count = |tier: PerformanceTier| reports.iter().filter(|r| r.tier == tier).count();
    let (at_risk, needs_attention, on_track) = (
        count(PerformanceTier::AtRisk),
        count(PerformanceTier::NeedsAttention),
        count(PerformanceTier::OnTrack),
    );
    let average = average_attendance(&students);
    run.completed(
        ANALYZE_PATTERNS,
        json!({
            "averageAttendance": average,
            "atRisk": at_risk,
            "needsAttention": needs_attention,
            "onTrack": on_track,
        }),
    )?;

    run.completed(GENERATE_REPORTS, json!({ "reportCount": reports.len() }))?;

    let to_review: Vec<&StudentReport> = reports
        .iter()
        .filter(|r| {
            r.tier == PerformanceTier::AtRisk
                || (run.schedule_meeting && r.tier == PerformanceTier::NeedsAttention)
        })
        .collect();

    let mut scheduled: Vec<&StudentReport> = Vec::new();
    if to_review.is_empty() {
        run.skipped(SCHEDULE_REVIEWS, "no students need a review meeting")?;
    } else {
        let mut failures = 0;
        for &report in &to_review {
            match run
                .services
                .calendar
                .schedule_meeting(&report.name, run.meeting_time)
                .await
            {
                Ok(_) => scheduled.push(report),
                Err(e) => {
                    warn!(execution_id = %run.execution_id, student = %report.name, error = %e, "review not scheduled");
                    failures += 1;
                }
            }
        }
        run.completed(
            SCHEDULE_REVIEWS,
            json!({ "scheduled": scheduled.len(), "failures": failures }),
        )?;
    }

    if scheduled.is_empty() {
        run.skipped(LOG_REVIEW, "no reviews scheduled")?;
    } else {
        for report in &scheduled {
            let id = report.student_id.to_string();
            run.log_action(LOG_REVIEW, &id, ACTION_INITIATED, ledger.tx_for(&id))
                .await?;
        }
        run.completed(LOG_REVIEW, json!({ "entries": scheduled.len() }))?;
    }

    let summary = PerformanceSummary {
        students_reviewed: students.len(),
        report_count: reports.len(),
        average_attendance: average,
        at_risk,
        needs_attention,
        on_track,
        meetings_scheduled: scheduled.iter().map(|r| r.name.clone()).collect(),
        blockchain_tx_hashes: ledger.hashes(),
        reports,
    };

    info!(
        execution_id = %run.execution_id,
        reviewed = summary.students_reviewed,
        at_risk = summary.at_risk,
        "performance review workflow finished"
    );
    Ok(serde_json::to_value(summary)?)
}
