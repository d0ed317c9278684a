// crates/dlp-scanner/src/tests.rs
// ============================================================================
// Module: Pattern Scanner Tests
// Description: Unit and fixture-backed tests for the scan algorithm.
// Purpose: Exercise empty input, min-match filtering, dedup, context, locale filtering, and reload.
// Dependencies: dlp-core, dlp-store-sqlite, tempfile
// ============================================================================

//! ## Overview
//! Builds a real [`dlp_store_sqlite::SqliteRegistryStore`] against a
//! temporary database for each test, since the scan loop's behavior depends
//! on registry content shaped the way the store actually returns it (joined
//! locale stable id, active-only filtering).

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panics are acceptable."
)]

use std::sync::Arc;

use dlp_core::Classification;
use dlp_core::LocaleInput;
use dlp_core::PatternInput;
use dlp_core::Registry;
use dlp_core::Scanner;
use dlp_core::UserEntryInput;
use dlp_core::Verdict;
use dlp_store_sqlite::SqliteRegistryStore;

use crate::PatternScanner;
use crate::ScannerConfig;

fn open_store() -> (tempfile::TempDir, Arc<SqliteRegistryStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteRegistryStore::open(&dir.path().join("dlp.db")).expect("open store");
    (dir, Arc::new(store))
}

fn seed_locale(store: &SqliteRegistryStore, stable_id: &str) -> dlp_core::LocaleId {
    store
        .create_locale(LocaleInput {
            stable_id: stable_id.to_string(),
            display_name: stable_id.to_string(),
            description: None,
            priority: 0,
        })
        .expect("create locale")
        .id
}

#[test]
fn empty_input_is_clean_with_zero_duration() {
    let (_dir, store) = open_store();
    let scanner = PatternScanner::new(store, ScannerConfig::default()).expect("scanner");
    let result = scanner.scan("", None);
    assert_eq!(result.verdict, Verdict::Clean);
    assert!(result.flags.is_empty());
}

#[test]
fn pattern_match_below_min_length_is_discarded() {
    let (_dir, store) = open_store();
    let locale_id = seed_locale(&store, "en-US");
    store
        .create_pattern(PatternInput {
            locale_id,
            category: "test".to_string(),
            pattern_type: "single-digit".to_string(),
            display_name: "Single Digit".to_string(),
            regex_source: Some(r"\d".to_string()),
            regex_flags: None,
            recognizer_ref: None,
            validator_ref: None,
            default_classification: Classification::AskFirst,
            false_positive_hints: None,
            example_values: Vec::new(),
        })
        .expect("create pattern");
    let scanner = PatternScanner::new(store, ScannerConfig { min_match_length: 3, ..ScannerConfig::default() }).expect("scanner");
    let result = scanner.scan("call me at 5", None);
    assert_eq!(result.verdict, Verdict::Clean);
}

#[test]
fn overlapping_pattern_matches_are_deduplicated() {
    let (_dir, store) = open_store();
    let locale_id = seed_locale(&store, "en-US");
    store
        .create_pattern(PatternInput {
            locale_id,
            category: "financial".to_string(),
            pattern_type: "ssn".to_string(),
            display_name: "Social Security Number".to_string(),
            regex_source: Some(r"\d{3}-\d{2}-\d{4}".to_string()),
            regex_flags: None,
            recognizer_ref: None,
            validator_ref: None,
            default_classification: Classification::NeverShare,
            false_positive_hints: None,
            example_values: Vec::new(),
        })
        .expect("create pattern");
    let scanner = PatternScanner::new(store, ScannerConfig::default()).expect("scanner");
    let result = scanner.scan("my ssn is 123-45-6789 on file", None);
    assert_eq!(result.verdict, Verdict::Flagged);
    assert_eq!(result.flags.len(), 1);
    assert_eq!(result.flags[0].label, "ssn");
    assert_eq!(result.flags[0].classification, Classification::NeverShare);
}

#[test]
fn entry_variant_match_uses_lower_confidence_than_primary() {
    let (_dir, store) = open_store();
    store
        .create_entry(UserEntryInput {
            label: "ceo-name".to_string(),
            display_name: "CEO Name".to_string(),
            primary_value: "Jane Doe".to_string(),
            classification: Classification::InternalOnly,
            category: "personnel".to_string(),
            notes: None,
            variants: vec![dlp_core::EntryVariantInput { variant_text: "J. Doe".to_string(), variant_type: None }],
        })
        .expect("create entry");
    let scanner = PatternScanner::new(store, ScannerConfig::default()).expect("scanner");
    let result = scanner.scan("please route this to J. Doe for approval", None);
    assert_eq!(result.verdict, Verdict::Flagged);
    assert_eq!(result.flags[0].confidence, 0.95);
}

#[test]
fn locale_filter_excludes_patterns_from_other_locales() {
    let (_dir, store) = open_store();
    let en = seed_locale(&store, "en-US");
    let fr = seed_locale(&store, "fr-FR");
    store
        .create_pattern(PatternInput {
            locale_id: en,
            category: "id".to_string(),
            pattern_type: "us-id".to_string(),
            display_name: "US Id".to_string(),
            regex_source: Some(r"ID-\d{4}".to_string()),
            regex_flags: None,
            recognizer_ref: None,
            validator_ref: None,
            default_classification: Classification::AskFirst,
            false_positive_hints: None,
            example_values: Vec::new(),
        })
        .expect("create pattern");
    let scanner = PatternScanner::new(store, ScannerConfig::default()).expect("scanner");
    let result = scanner.scan("reference ID-1234 attached", Some("fr-FR"));
    assert_eq!(result.verdict, Verdict::Clean);
    let result = scanner.scan("reference ID-1234 attached", Some("en-US"));
    assert_eq!(result.verdict, Verdict::Flagged);
    let _ = fr;
}

#[test]
fn reload_picks_up_newly_created_patterns() {
    let (_dir, store) = open_store();
    let locale_id = seed_locale(&store, "en-US");
    let scanner =
        PatternScanner::new(Arc::clone(&store) as Arc<dyn Registry + Send + Sync>, ScannerConfig::default())
            .expect("scanner");
    assert_eq!(scanner.scan("token ABC-9999 visible", None).verdict, Verdict::Clean);

    store
        .create_pattern(PatternInput {
            locale_id,
            category: "token".to_string(),
            pattern_type: "abc-token".to_string(),
            display_name: "ABC Token".to_string(),
            regex_source: Some(r"ABC-\d{4}".to_string()),
            regex_flags: None,
            recognizer_ref: None,
            validator_ref: None,
            default_classification: Classification::AskFirst,
            false_positive_hints: None,
            example_values: Vec::new(),
        })
        .expect("create pattern");

    assert_eq!(scanner.scan("token ABC-9999 visible", None).verdict, Verdict::Clean);
    scanner.reload().expect("reload");
    assert_eq!(scanner.scan("token ABC-9999 visible", None).verdict, Verdict::Flagged);
}

#[test]
fn invalid_regex_is_reported_as_a_compile_failure_not_fatal() {
    let (_dir, store) = open_store();
    let locale_id = seed_locale(&store, "en-US");
    store
        .create_pattern(PatternInput {
            locale_id,
            category: "broken".to_string(),
            pattern_type: "unterminated".to_string(),
            display_name: "Unterminated".to_string(),
            regex_source: Some("(unterminated".to_string()),
            regex_flags: None,
            recognizer_ref: None,
            validator_ref: None,
            default_classification: Classification::AskFirst,
            false_positive_hints: None,
            example_values: Vec::new(),
        })
        .expect("create pattern");
    let scanner = PatternScanner::new(store, ScannerConfig::default()).expect("scanner");
    let failures = scanner.compile_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "unterminated");
}

#[test]
fn context_window_is_truncated_with_ellipsis_markers() {
    let (_dir, store) = open_store();
    store
        .create_entry(UserEntryInput {
            label: "secret-code".to_string(),
            display_name: "Secret Code".to_string(),
            primary_value: "ALPHA-ONE".to_string(),
            classification: Classification::NeverShare,
            category: "codes".to_string(),
            notes: None,
            variants: Vec::new(),
        })
        .expect("create entry");
    let scanner = PatternScanner::new(store, ScannerConfig { context_size: 5, ..ScannerConfig::default() }).expect("scanner");
    let text = "this message mentions ALPHA-ONE somewhere in the middle of a much longer sentence";
    let result = scanner.scan(text, None);
    assert_eq!(result.verdict, Verdict::Flagged);
    let context = &result.flags[0].context;
    assert!(context.starts_with("..."), "context should be truncated on the left: {context}");
    assert!(context.contains("[ALPHA-ONE]"), "context should bracket the match: {context}");
}
