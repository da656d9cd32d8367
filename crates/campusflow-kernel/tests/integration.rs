//! Integration tests for the campusflow-kernel crate.
//!
//! These tests exercise the execution tracker, event bus, and proof hashing
//! as integrated subsystems.

use std::sync::Arc;

use campusflow_kernel::{
    ExecutionBus, ExecutionEvent, ExecutionOutcome, ExecutionStatus, ExecutionTracker,
    ProgressStatus, ServiceKind, StepDescriptor, StepRecord, TrackerConfig, TriggerKind,
    WorkflowDefinition,
};
use serde_json::json;

fn low_attendance() -> Arc<WorkflowDefinition> {
    Arc::new(WorkflowDefinition {
        id: "attendance_low_75".into(),
        name: "Low Attendance Detection & Notification".into(),
        description: "Detect students below 75% attendance".into(),
        trigger: TriggerKind::NaturalLanguage,
        steps: vec![
            StepDescriptor::new("FETCH_STUDENTS", ServiceKind::DataStore, "Fetch students"),
            StepDescriptor::new("SEND_NOTIFICATIONS", ServiceKind::Messaging, "Notify"),
            StepDescriptor::new("LOG_DATABASE", ServiceKind::DataStore, "Log action"),
        ],
        output: "WorkflowExecutionSummary".into(),
    })
}

// ═══════════════════════════════════════════════════════════════════════
//  Tracker + event bus
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn tracker_publishes_full_lifecycle() {
    let bus = ExecutionBus::new(32);
    let mut rx = bus.subscribe();
    let tracker = ExecutionTracker::with_bus(TrackerConfig::default(), bus);

    let ctx = tracker.start(low_attendance(), TriggerKind::NaturalLanguage, json!({}));
    tracker
        .log_step(
            ctx.execution_id,
            "FETCH_STUDENTS",
            StepRecord::completed(json!({"count": 2})),
        )
        .unwrap();
    tracker
        .complete(ctx.execution_id, ExecutionOutcome::success(json!({"affectedCount": 2})))
        .unwrap();

    let started = rx.recv().await.unwrap();
    assert!(matches!(started.as_ref(), ExecutionEvent::ExecutionStarted { .. }));

    let step = rx.recv().await.unwrap();
    match step.as_ref() {
        ExecutionEvent::StepRecorded { step_id, .. } => assert_eq!(step_id, "FETCH_STUDENTS"),
        other => panic!("unexpected: {other:?}"),
    }

    let finished = rx.recv().await.unwrap();
    match finished.as_ref() {
        ExecutionEvent::ExecutionFinished { status, proof, .. } => {
            assert_eq!(*status, ExecutionStatus::Completed);
            assert_eq!(proof.as_ref().map(String::len), Some(64));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(finished.execution_id(), ctx.execution_id);
}

#[tokio::test]
async fn concurrent_executions_keep_separate_logs() {
    let tracker = ExecutionTracker::default();
    let mut handles = Vec::new();

    for n in 0..8u32 {
        let tracker = tracker.clone();
        handles.push(tokio::spawn(async move {
            let ctx = tracker.start(low_attendance(), TriggerKind::Manual, json!({ "n": n }));
            for step in ["FETCH_STUDENTS", "SEND_NOTIFICATIONS", "LOG_DATABASE"] {
                tracker
                    .log_step(ctx.execution_id, step, StepRecord::completed(json!({ "n": n })))
                    .unwrap();
                tokio::task::yield_now().await;
            }
            tracker
                .complete(ctx.execution_id, ExecutionOutcome::success(json!({})))
                .unwrap();
            ctx.execution_id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    assert!(tracker.active().is_empty());
    assert_eq!(tracker.metrics().total_executions, 8);
    for id in ids {
        let view = tracker.status(id).unwrap();
        let order: Vec<_> = view.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["FETCH_STUDENTS", "SEND_NOTIFICATIONS", "LOG_DATABASE"]);
        let n = &view.metadata["n"];
        assert!(view.steps.iter().all(|s| &s.data["n"] == n));
        assert!(tracker.verify(id).unwrap());
    }
}

#[test]
fn progress_tracks_partial_execution() {
    let tracker = ExecutionTracker::default();
    let ctx = tracker.start(low_attendance(), TriggerKind::Manual, json!({}));
    tracker
        .log_step(ctx.execution_id, "FETCH_STUDENTS", StepRecord::completed(json!({})))
        .unwrap();
    tracker
        .log_step(
            ctx.execution_id,
            "SEND_NOTIFICATIONS",
            StepRecord::failed("provider unavailable"),
        )
        .unwrap();
    tracker
        .complete(
            ctx.execution_id,
            ExecutionOutcome::failure("provider unavailable", json!({})),
        )
        .unwrap();

    let progress = tracker.progress(ctx.execution_id).unwrap();
    assert_eq!(progress.status, ExecutionStatus::Failed);
    assert_eq!(progress.steps[0].status, ProgressStatus::Completed);
    assert_eq!(progress.steps[1].status, ProgressStatus::Failed);
    assert_eq!(
        progress.steps[1].error.as_deref(),
        Some("provider unavailable")
    );
    assert_eq!(progress.steps[2].status, ProgressStatus::Pending);
}

#[test]
fn execution_view_serializes_for_dashboard() {
    let tracker = ExecutionTracker::default();
    let ctx = tracker.start(low_attendance(), TriggerKind::NaturalLanguage, json!({}));
    tracker
        .log_step(ctx.execution_id, "FETCH_STUDENTS", StepRecord::completed(json!({})))
        .unwrap();
    tracker
        .complete(ctx.execution_id, ExecutionOutcome::success(json!({"affectedCount": 0})))
        .unwrap();

    let view = tracker.status(ctx.execution_id).unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["workflowId"], "attendance_low_75");
    assert_eq!(json["status"], "COMPLETED");
    assert_eq!(json["trigger"], "natural_language");
    assert_eq!(json["steps"][0]["service"], "DataStore");
    assert_eq!(json["result"]["data"]["affectedCount"], 0);
    assert_eq!(json["proof"]["algorithm"], "sha256");
    assert_eq!(json["isActive"], false);
}
