#![allow(clippy::unwrap_used, clippy::expect_used)]

use bigleague_core::errors::{ExError, ExErrorKind, StoreError};
use bigleague_core::logging_facility::test_capture::init_test_capture;
use bigleague_core::{log_op_end, log_op_error, log_op_start};
use bigleague_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use tracing::Level;

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    let start_events: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .collect();

    assert_eq!(start_events.len(), 1);
    assert_eq!(start_events[0].level, Level::DEBUG);
}

#[test]
fn test_log_op_end_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[0].level, Level::INFO);
    assert_eq!(events[0].fields.get("duration_ms"), Some(&"42".to_string()));
}

#[test]
fn test_start_and_end_pair() {
    let capture = init_test_capture();
    let op_name = "test_start_end_pair_unique_3";

    log_op_start!(op_name, table = "game");
    log_op_end!(op_name, duration_ms = 1, table = "game");

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[1].event.as_deref(), Some(EVENT_END));
    assert!(events.iter().all(|e| e.table.as_deref() == Some("game")));
}

#[test]
fn test_client_error_logged_at_warn_with_code() {
    let capture = init_test_capture();
    let op_name = "test_client_error_unique_4";

    let err: ExError = StoreError::CircularReference {
        id: "e1".to_string(),
    }
    .into();
    log_op_error!(op_name, &err, duration_ms = 5);

    let error_event = capture
        .events_for_op(op_name)
        .into_iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have error event");

    assert_eq!(error_event.level, Level::WARN);
    assert_eq!(
        error_event.fields.get("err.code"),
        Some(&"ERR_CIRCULAR_REFERENCE".to_string())
    );
    assert_eq!(
        error_event.fields.get("err.kind"),
        Some(&"CircularReference".to_string())
    );
}

#[test]
fn test_server_error_logged_at_error() {
    let capture = init_test_capture();
    let op_name = "test_server_error_unique_5";

    let err = ExError::new(ExErrorKind::Persistence).with_message("disk full");
    log_op_error!(op_name, &err, duration_ms = 2, table = "offer");

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].level, Level::ERROR);
    assert_eq!(events[0].table.as_deref(), Some("offer"));
}

#[test]
fn test_log_macros_with_multiple_fields() {
    let capture = init_test_capture();
    let op_name = "test_log_macros_fields_unique_6";

    log_op_start!(op_name, table = "cell", pin = 1234);

    let start_event = capture
        .events_for_op(op_name)
        .into_iter()
        .next()
        .expect("Should have start event");

    assert_eq!(start_event.table.as_deref(), Some("cell"));
    assert_eq!(start_event.fields.get("pin"), Some(&"1234".to_string()));
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_test_capture_assert_event_exists_fails() {
    let capture = init_test_capture();

    capture.assert_event_exists("nonexistent_op_truly_unique_999", EVENT_START);
}

#[test]
fn test_test_capture_count_events() {
    let capture = init_test_capture();
    let op1_name = "test_count_events_op1_unique_8";
    let op2_name = "test_count_events_op2_unique_8";

    log_op_start!(op1_name);
    log_op_start!(op2_name);
    log_op_end!(op1_name, duration_ms = 10);

    let start_count = capture.count_events(|e| {
        e.event.as_deref() == Some(EVENT_START)
            && (e.op.as_deref() == Some(op1_name) || e.op.as_deref() == Some(op2_name))
    });
    let end_count = capture.count_events(|e| {
        e.event.as_deref() == Some(EVENT_END)
            && (e.op.as_deref() == Some(op1_name) || e.op.as_deref() == Some(op2_name))
    });

    assert_eq!(start_count, 2);
    assert_eq!(end_count, 1);
}
