//! Integration tests for the campusflow-intent crate.
//!
//! These run whole workflows against the in-process collaborators and check
//! what ends up in the tracker, the outbox, the ledger, and the action log.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use campusflow_adapters::{
    AdapterError, Assignment, DataStore, InMemoryDataStore, LogEntry, MockCalendar, MockLedger,
    MockMessenger, NewLogEntry, Student, demo_seed,
};
use campusflow_intent::{
    CommandOutcome, ExecutorConfig, RuleInterpreter, Services, WorkflowExecutor, WorkflowParams,
    WorkflowRegistry,
};
use campusflow_kernel::{
    ExecutionBus, ExecutionEvent, ExecutionStatus, ExecutionTracker, ProgressStatus, StepStatus,
    TrackerConfig, TriggerKind,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct Harness {
    store: Arc<InMemoryDataStore>,
    messenger: Arc<MockMessenger>,
    calendar: Arc<MockCalendar>,
    ledger: Arc<MockLedger>,
    executor: WorkflowExecutor,
}

fn harness_with(messenger: MockMessenger, config: ExecutorConfig) -> Harness {
    harness_on(InMemoryDataStore::demo(), messenger, config)
}

fn harness_on(store: InMemoryDataStore, messenger: MockMessenger, config: ExecutorConfig) -> Harness {
    let store = Arc::new(store);
    let messenger = Arc::new(messenger);
    let calendar = Arc::new(MockCalendar::new());
    let ledger = Arc::new(MockLedger::new());
    let services = Services {
        store: store.clone(),
        messenger: messenger.clone(),
        calendar: calendar.clone(),
        ledger: ledger.clone(),
    };
    let executor = WorkflowExecutor::new(
        WorkflowRegistry::builtin(),
        ExecutionTracker::new(TrackerConfig::default()),
        Arc::new(RuleInterpreter::new().unwrap()),
        services,
        config,
    );
    Harness {
        store,
        messenger,
        calendar,
        ledger,
        executor,
    }
}

fn harness() -> Harness {
    harness_with(MockMessenger::new(), ExecutorConfig::default())
}

/// A data store whose every call fails.
struct DownStore;

#[async_trait]
impl DataStore for DownStore {
    async fn students_below(&self, _threshold: f64) -> campusflow_adapters::Result<Vec<Student>> {
        Err(down())
    }
    async fn students(&self) -> campusflow_adapters::Result<Vec<Student>> {
        Err(down())
    }
    async fn assignments(&self) -> campusflow_adapters::Result<Vec<Assignment>> {
        Err(down())
    }
    async fn insert_log(&self, _entry: NewLogEntry) -> campusflow_adapters::Result<LogEntry> {
        Err(down())
    }
    async fn logs(&self) -> campusflow_adapters::Result<Vec<LogEntry>> {
        Err(down())
    }
}

fn down() -> AdapterError {
    AdapterError::RequestFailed {
        service: "datastore".into(),
        reason: "connection refused".into(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Attendance workflows
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn low_attendance_notifies_logs_and_records_on_ledger() {
    let h = harness();
    let outcome = h
        .executor
        .execute("Notify all students with attendance below 75%")
        .await
        .unwrap();
    let view = outcome.execution().unwrap();
    assert_eq!(view.status, ExecutionStatus::Completed);

    let sent = h.messenger.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent[0].body.starts_with("Alert: Your attendance is"));
    assert!(sent.iter().all(|m| m.to.starts_with("whatsapp:+1555")));

    assert_eq!(h.ledger.entries().len(), 3);
    assert!(h.ledger.entries().iter().all(|e| e.action == "NOTIFY_LOW_ATTENDANCE"));

    let logs = h.store.logs().await.unwrap();
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|l| l.execution_id == Some(view.execution_id)));
    assert!(logs.iter().all(|l| l.tx_hash.is_some()));

    // The GENERATE_PROOF step snapshots the seven steps before it.
    let proof_step = view.steps.last().unwrap();
    assert_eq!(proof_step.id, "GENERATE_PROOF");
    assert_eq!(proof_step.data["stepCount"], 7);

    assert!(h.executor.tracker().verify(view.execution_id).unwrap());
}

#[tokio::test]
async fn low_attendance_meets_repeat_defaulters() {
    let h = harness();
    let view = h
        .executor
        .run(
            "attendance_low_75",
            &WorkflowParams::default(),
            TriggerKind::Manual,
            json!({}),
        )
        .await
        .unwrap();

    // Aarav has 3 warnings and Dana 2; Bianca has only 1.
    let data = &view.result.as_ref().unwrap().data;
    let students: Vec<_> = data["meetingsScheduled"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["student"].as_str().unwrap())
        .collect();
    assert_eq!(students, vec!["Aarav Mehta", "Dana Okafor"]);
    assert!(
        data["meetingsScheduled"]
            .as_array()
            .unwrap()
            .iter()
            .all(|m| m["scheduledTime"] == "Tomorrow 10am")
    );
    assert_eq!(h.calendar.meetings().len(), 2);

    let step = view
        .steps
        .iter()
        .find(|s| s.id == "SCHEDULE_MEETINGS")
        .unwrap();
    assert_eq!(step.status, StepStatus::Completed);
    assert_eq!(step.data["scheduled"], 2);
}

#[tokio::test]
async fn low_attendance_meeting_request_covers_everyone_at_risk() {
    let h = harness();
    let outcome = h
        .executor
        .execute("Notify students with attendance below 75% and schedule a meeting")
        .await
        .unwrap();
    let view = outcome.execution().unwrap();
    assert_eq!(view.workflow_id, "attendance_low_75");

    let data = &view.result.as_ref().unwrap().data;
    assert_eq!(data["affectedCount"], 3);
    assert_eq!(data["meetingsScheduled"].as_array().unwrap().len(), 3);
    assert_eq!(h.calendar.meetings().len(), 3);
}

#[tokio::test]
async fn low_attendance_without_repeat_defaulters_skips_meetings() {
    let mut seed = demo_seed();
    for student in &mut seed.students {
        student.warnings = 0;
    }
    let h = harness_on(
        InMemoryDataStore::from_seed(seed).unwrap(),
        MockMessenger::new(),
        ExecutorConfig::default(),
    );
    let view = h
        .executor
        .run(
            "attendance_low_75",
            &WorkflowParams::default(),
            TriggerKind::Manual,
            json!({}),
        )
        .await
        .unwrap();

    let data = &view.result.as_ref().unwrap().data;
    assert_eq!(data["affectedCount"], 3);
    assert_eq!(data["meetingsScheduled"], json!([]));
    assert!(h.calendar.meetings().is_empty());
    let step = view
        .steps
        .iter()
        .find(|s| s.id == "SCHEDULE_MEETINGS")
        .unwrap();
    assert_eq!(step.status, StepStatus::Skipped);
}

#[tokio::test]
async fn unreachable_student_gets_fallback_log() {
    // Bianca Rossi, 71.5%.
    let h = harness_with(
        MockMessenger::new().with_unreachable(["+15550100002"]),
        ExecutorConfig::default(),
    );
    let view = h
        .executor
        .run(
            "attendance_low_75",
            &WorkflowParams::default(),
            TriggerKind::Manual,
            json!({}),
        )
        .await
        .unwrap();

    let data = &view.result.as_ref().unwrap().data;
    assert!(view.result.as_ref().unwrap().success);
    assert_eq!(data["affectedCount"], 3);
    assert_eq!(data["successCount"], 2);
    assert_eq!(data["failureCount"], 1);

    let failed: Vec<_> = data["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|d| d["notified"] == false)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["name"], "Bianca Rossi");

    let logs = h.store.logs().await.unwrap();
    let fallback: Vec<_> = logs
        .iter()
        .filter(|l| l.action == "NOTIFICATION_FAILED_FALLBACK_LOGGED")
        .collect();
    assert_eq!(fallback.len(), 1);
    assert_eq!(fallback[0].tx_hash, None);
    assert_eq!(
        logs.iter()
            .filter(|l| l.action == "NOTIFY_LOW_ATTENDANCE")
            .count(),
        2
    );
}

#[tokio::test]
async fn critical_intervention_schedules_and_alerts_admins() {
    let h = harness_with(
        MockMessenger::new(),
        ExecutorConfig {
            admin_contacts: vec!["+15550199999".into()],
            ..ExecutorConfig::default()
        },
    );
    let outcome = h
        .executor
        .execute("Flag students below 60% and schedule a Google Meet for next Friday at 2pm")
        .await
        .unwrap();
    let view = outcome.execution().unwrap();
    assert_eq!(view.workflow_id, "attendance_critical_60");

    // Only Aarav Mehta (58%) is below 60.
    let data = &view.result.as_ref().unwrap().data;
    assert_eq!(data["criticalCount"], 1);
    assert_eq!(data["administratorsNotified"], 1);
    assert_eq!(
        data["meetingsScheduled"][0]["scheduledTime"],
        "next friday at 2pm"
    );
    assert_eq!(h.calendar.meetings().len(), 1);

    let sent = h.messenger.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].body.starts_with("URGENT:"));
    assert!(sent[1].body.contains("Aarav Mehta"));
    assert_eq!(sent[1].to, "whatsapp:+15550199999");
}

#[tokio::test]
async fn nobody_below_threshold_still_completes() {
    let h = harness();
    let params = WorkflowParams {
        threshold: Some(10),
        ..WorkflowParams::default()
    };
    let view = h
        .executor
        .run("attendance_critical_60", &params, TriggerKind::Manual, json!({}))
        .await
        .unwrap();

    assert_eq!(view.status, ExecutionStatus::Completed);
    assert_eq!(view.result.as_ref().unwrap().data["criticalCount"], 0);
    let skipped: Vec<_> = view
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Skipped)
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(skipped, vec!["SCHEDULE_MEETINGS", "NOTIFY_ADMINISTRATORS"]);
    assert!(h.messenger.sent().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
//  Assignment and performance workflows
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn assignment_tracking_reminds_each_student_once() {
    let h = harness();
    let outcome = h
        .executor
        .execute("Send reminders for incomplete assignments")
        .await
        .unwrap();
    let view = outcome.execution().unwrap();
    assert_eq!(view.workflow_id, "assignment_tracking");

    let data = &view.result.as_ref().unwrap().data;
    assert_eq!(data["incompleteCount"], 3);
    assert_eq!(data["remindersSent"], 3);
    assert_eq!(data["calendarEventsCreated"], 2);
    assert_eq!(
        data["studentsReminded"],
        json!(["Aarav Mehta", "Bianca Rossi", "Dana Okafor"])
    );

    assert_eq!(h.ledger.entries().len(), 1);
    assert_eq!(h.ledger.entries()[0].action, "ASSIGNMENT_AUDIT");

    let logs = h.store.logs().await.unwrap();
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|l| l.action == "ASSIGNMENT_REMINDER_SENT"));
}

#[tokio::test]
async fn performance_review_classifies_demo_roster() {
    let h = harness();
    let view = h
        .executor
        .run(
            "performance_review",
            &WorkflowParams::default(),
            TriggerKind::Manual,
            json!({}),
        )
        .await
        .unwrap();

    let data = &view.result.as_ref().unwrap().data;
    assert_eq!(data["studentsReviewed"], 5);
    assert_eq!(data["atRisk"], 2);
    assert_eq!(data["needsAttention"], 1);
    assert_eq!(data["onTrack"], 2);
    assert_eq!(data["meetingsScheduled"], json!(["Aarav Mehta", "Dana Okafor"]));
    assert_eq!(data["reports"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn performance_review_with_meetings_includes_needs_attention() {
    let h = harness();
    let outcome = h
        .executor
        .execute("Review performance and schedule meetings for tomorrow")
        .await
        .unwrap();
    let view = outcome.execution().unwrap();
    let data = &view.result.as_ref().unwrap().data;
    assert_eq!(
        data["meetingsScheduled"],
        json!(["Aarav Mehta", "Bianca Rossi", "Dana Okafor"])
    );
    assert!(h.calendar.meetings().iter().all(|(_, m)| m.scheduled_time == "tomorrow"));
}

#[tokio::test]
async fn performance_review_sums_large_assignment_totals() {
    let mut seed = demo_seed();
    for id in [90, 91] {
        seed.assignments.push(Assignment {
            id,
            student_id: 3,
            title: format!("Bulk {id}"),
            completed: 3_000_000_000,
            total: 3_000_000_000,
            due_date: None,
        });
    }
    let h = harness_on(
        InMemoryDataStore::from_seed(seed).unwrap(),
        MockMessenger::new(),
        ExecutorConfig::default(),
    );
    let view = h
        .executor
        .run(
            "performance_review",
            &WorkflowParams::default(),
            TriggerKind::Manual,
            json!({}),
        )
        .await
        .unwrap();

    assert_eq!(view.status, ExecutionStatus::Completed);
    let data = &view.result.as_ref().unwrap().data;
    let chen = data["reports"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "Chen Wei")
        .unwrap();
    assert_eq!(chen["assignmentsTotal"], 6_000_000_001u64);
    assert_eq!(chen["tier"], "ON_TRACK");
}

// ═══════════════════════════════════════════════════════════════════════
//  Failures, history, events
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn data_store_outage_fails_the_execution() {
    let services = Services {
        store: Arc::new(DownStore),
        ..Services::demo()
    };
    let executor = WorkflowExecutor::new(
        WorkflowRegistry::builtin(),
        ExecutionTracker::new(TrackerConfig::default()),
        Arc::new(RuleInterpreter::new().unwrap()),
        services,
        ExecutorConfig::default(),
    );

    let outcome = executor.execute("check attendance below 70").await.unwrap();
    let view = outcome.execution().unwrap();

    assert_eq!(view.status, ExecutionStatus::Failed);
    assert_eq!(view.steps.len(), 1);
    assert_eq!(view.steps[0].id, "FETCH_STUDENTS");
    assert_eq!(view.steps[0].status, StepStatus::Failed);
    assert!(view.steps[0].error.as_deref().unwrap().contains("connection refused"));

    let result = view.result.as_ref().unwrap();
    assert!(!result.success);
    assert_eq!(result.data["failedStep"], "FETCH_STUDENTS");

    let progress = executor.tracker().progress(view.execution_id).unwrap();
    assert_eq!(progress.steps[0].status, ProgressStatus::Failed);
    assert!(progress.steps[1..]
        .iter()
        .all(|s| s.status == ProgressStatus::Pending));

    let metrics = executor.tracker().metrics();
    assert_eq!(metrics.failed_executions, 1);
    assert_eq!(metrics.successful_executions, 0);
}

#[tokio::test]
async fn history_and_metrics_follow_runs() {
    let h = harness();
    for command in [
        "check attendance",
        "incomplete assignments",
        "performance review",
        "what time is it",
    ] {
        h.executor.execute(command).await.unwrap();
    }

    let tracker = h.executor.tracker();
    let history = tracker.history(10);
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].workflow_id, "performance_review");
    assert_eq!(history[2].workflow_id, "attendance_low_75");
    assert!(tracker.active().is_empty());

    let metrics = tracker.metrics();
    assert_eq!(metrics.total_executions, 3);
    assert_eq!(metrics.successful_executions, 3);
    assert_eq!(metrics.success_rate, 100.0);
}

#[tokio::test]
async fn bus_sees_every_step() {
    let bus = ExecutionBus::new(64);
    let mut rx = bus.subscribe();
    let executor = WorkflowExecutor::new(
        WorkflowRegistry::builtin(),
        ExecutionTracker::with_bus(TrackerConfig::default(), bus),
        Arc::new(RuleInterpreter::new().unwrap()),
        Services::demo(),
        ExecutorConfig::default(),
    );

    let outcome = executor.execute("incomplete assignments").await.unwrap();
    let CommandOutcome::Executed(view) = outcome else {
        panic!("expected an execution");
    };

    let mut steps = 0;
    let mut finished = false;
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.execution_id(), view.execution_id);
        match event.as_ref() {
            ExecutionEvent::StepRecorded { .. } => steps += 1,
            ExecutionEvent::ExecutionFinished { status, .. } => {
                assert_eq!(*status, ExecutionStatus::Completed);
                finished = true;
            }
            ExecutionEvent::ExecutionStarted { .. } => {}
        }
    }
    assert_eq!(steps, 6);
    assert!(finished);
}
