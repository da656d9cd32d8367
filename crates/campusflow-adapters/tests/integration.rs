//! Integration tests for the campusflow-adapters crate.
//!
//! These tests exercise the collaborators through their trait objects, the
//! way workflows use them.

use std::io::Write as _;
use std::sync::Arc;

use campusflow_adapters::{
    AdapterError, Calendar, DataStore, InMemoryDataStore, Ledger, Messenger, MockCalendar,
    MockLedger, MockMessenger, NewLogEntry,
};
use campusflow_kernel::privacy::hash_student_id;

// ═══════════════════════════════════════════════════════════════════════
//  Data store
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn seed_file_round_trip_through_trait_object() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "students": [
                {{"id": 1, "name": "Zoe", "attendance": 55.0, "phone": "+1001"}},
                {{"id": 2, "name": "Adam", "attendance": 90.0, "phone": "+1002", "warnings": 1}}
            ],
            "assignments": [
                {{"id": 10, "student_id": 1, "title": "Lab", "completed": 0, "total": 2}}
            ]
        }}"#
    )
    .unwrap();

    let store: Arc<dyn DataStore> =
        Arc::new(InMemoryDataStore::from_seed_file(file.path()).await.unwrap());

    let students = store.students().await.unwrap();
    assert_eq!(students[0].name, "Adam");
    assert_eq!(students[1].warnings, 0);

    let below = store.students_below(75.0).await.unwrap();
    assert_eq!(below.len(), 1);
    assert_eq!(below[0].name, "Zoe");

    let assignments = store.assignments().await.unwrap();
    assert!(assignments[0].is_incomplete());
    assert!(assignments[0].due_date.is_none());
}

#[tokio::test]
async fn malformed_seed_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    let result = InMemoryDataStore::from_seed_file(file.path()).await;
    assert!(matches!(result, Err(AdapterError::SerializationError(_))));

    let missing = InMemoryDataStore::from_seed_file("/nonexistent/seed.json").await;
    assert!(matches!(missing, Err(AdapterError::IoError(_))));
}

#[tokio::test]
async fn log_rows_keep_hashed_subjects() {
    let store = InMemoryDataStore::demo();
    let row = store
        .insert_log(NewLogEntry {
            student_hash: hash_student_id("1"),
            action: "NOTIFY_LOW_ATTENDANCE".into(),
            tx_hash: Some("0xabc".into()),
            execution_id: None,
        })
        .await
        .unwrap();
    assert_eq!(row.id, 1);
    assert_eq!(row.student_hash.len(), 64);
    assert_eq!(store.logs().await.unwrap().len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════
//  Providers
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn providers_through_trait_objects() {
    let messenger: Arc<dyn Messenger> = Arc::new(MockMessenger::new());
    let calendar: Arc<dyn Calendar> = Arc::new(MockCalendar::new());
    let ledger: Arc<dyn Ledger> = Arc::new(MockLedger::new());

    let receipt = messenger.send("+1001", "Your attendance is low").await.unwrap();
    assert!(receipt.sid.starts_with("mock-sid-"));

    let meeting = calendar
        .schedule_meeting("Zoe", "next monday at 2pm")
        .await
        .unwrap();
    assert_eq!(meeting.scheduled_time, "next monday at 2pm");

    let tx = ledger
        .record_action("1", "NOTIFY_LOW_ATTENDANCE", "exec")
        .await
        .unwrap();
    assert_eq!(tx.student_hash, format!("0x{}", hash_student_id("1")));
}

#[tokio::test]
async fn concurrent_ledger_writes_are_all_recorded() {
    let ledger = Arc::new(MockLedger::new());
    let mut handles = Vec::new();
    for i in 0..16 {
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            ledger
                .record_action(&i.to_string(), "AUDIT", "exec")
                .await
                .unwrap()
                .tx_hash
        }));
    }
    let mut hashes = Vec::new();
    for handle in handles {
        hashes.push(handle.await.unwrap());
    }
    hashes.sort();
    hashes.dedup();
    assert_eq!(hashes.len(), 16);
    assert_eq!(ledger.entries().len(), 16);
}
