// crates/dlp-store-sqlite/tests/decision_log_store.rs
// ============================================================================
// Module: SQLite Decision Log Store Integration Tests
// Description: Coverage of batching, query filters, stats, export, and retention purge.
// Purpose: Exercise SqliteDecisionLog against a real on-disk database.
// Dependencies: dlp-core, dlp-store-sqlite, tempfile
// ============================================================================

//! Integration tests for the SQLite decision log store.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use dlp_core::Action;
use dlp_core::DecisionLog;
use dlp_core::DecisionLogFilter;
use dlp_core::DecisionLogRecord;
use dlp_core::DecisionType;
use dlp_core::RequestId;
use dlp_core::Timestamp;
use dlp_store_sqlite::SqliteDecisionLog;

fn open_log(batch_size: usize) -> (tempfile::TempDir, SqliteDecisionLog) {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = SqliteDecisionLog::open_with_batch_size(&dir.path().join("log.sqlite3"), batch_size).expect("open");
    (dir, log)
}

#[test]
fn record_below_batch_size_is_not_flushed_until_explicit_flush() {
    let (_dir, log) = open_log(10);
    let mut record = DecisionLogRecord::new(DecisionType::OutboundScan, Timestamp::now());
    record.action = Some(Action::Allow);
    log.record(record).expect("record");
    let before_flush = log.query(DecisionLogFilter::default()).expect("query before flush");
    assert!(before_flush.is_empty());
    log.flush().expect("flush");
    let after_flush = log.query(DecisionLogFilter::default()).expect("query after flush");
    assert_eq!(after_flush.len(), 1);
}

#[test]
fn record_auto_flushes_at_batch_size() {
    let (_dir, log) = open_log(2);
    for _ in 0..2 {
        let record = DecisionLogRecord::new(DecisionType::OutboundScan, Timestamp::now());
        log.record(record).expect("record");
    }
    let rows = log.query(DecisionLogFilter::default()).expect("query");
    assert_eq!(rows.len(), 2);
}

#[test]
fn close_flushes_and_appends_shutdown_record() {
    let (_dir, log) = open_log(10);
    log.record(DecisionLogRecord::new(DecisionType::OutboundScan, Timestamp::now())).expect("record");
    log.close().expect("close");
    let rows = log.query(DecisionLogFilter::default()).expect("query");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.decision_type == DecisionType::SystemShutdown));
}

#[test]
fn query_filters_by_request_id() {
    let (_dir, log) = open_log(1);
    let mut matching = DecisionLogRecord::new(DecisionType::OutboundScan, Timestamp::now());
    matching.request_id = Some(RequestId::new("req-1"));
    log.record(matching).expect("record matching");
    let mut other = DecisionLogRecord::new(DecisionType::OutboundScan, Timestamp::now());
    other.request_id = Some(RequestId::new("req-2"));
    log.record(other).expect("record other");

    let filtered = log
        .query(DecisionLogFilter { request_id: Some(RequestId::new("req-1")), ..DecisionLogFilter::default() })
        .expect("query");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].request_id, Some(RequestId::new("req-1")));
}

#[test]
fn stats_aggregates_by_type_and_action() {
    let (_dir, log) = open_log(1);
    let mut allowed = DecisionLogRecord::new(DecisionType::OutboundScan, Timestamp::now());
    allowed.action = Some(Action::Allow);
    allowed.duration_ms = Some(10);
    log.record(allowed).expect("record allowed");
    let mut blocked = DecisionLogRecord::new(DecisionType::OutboundScan, Timestamp::now());
    blocked.action = Some(Action::Block);
    blocked.duration_ms = Some(30);
    log.record(blocked).expect("record blocked");

    let stats = log.stats(DecisionLogFilter::default()).expect("stats");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.average_duration_ms, Some(20.0));
    let allow_count = stats.by_action.iter().find(|(action, _)| *action == Action::Allow).map(|(_, count)| *count);
    assert_eq!(allow_count, Some(1));
}

#[test]
fn purge_old_entries_removes_rows_past_retention() {
    let (_dir, log) = open_log(1);
    let mut old = DecisionLogRecord::new(DecisionType::OutboundScan, Timestamp::from_unix_millis(0));
    old.action = Some(Action::Allow);
    log.record(old).expect("record old");
    let purged = log.purge_old_entries(1).expect("purge");
    assert_eq!(purged, 1);
    let remaining = log.query(DecisionLogFilter::default()).expect("query");
    assert!(remaining.is_empty());
}

#[test]
fn export_to_file_writes_json_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = SqliteDecisionLog::open_with_batch_size(&dir.path().join("log.sqlite3"), 1).expect("open");
    log.record(DecisionLogRecord::new(DecisionType::OutboundScan, Timestamp::now())).expect("record");
    let export_path = dir.path().join("export.jsonl");
    let written = log.export_to_file(&export_path, DecisionLogFilter::default()).expect("export");
    assert_eq!(written, 1);
    let contents = std::fs::read_to_string(&export_path).expect("read export");
    assert_eq!(contents.lines().count(), 1);
}
