// crates/dlp-store-sqlite/tests/registry_store.rs
// ============================================================================
// Module: SQLite Registry Store Integration Tests
// Description: End-to-end coverage of Registry CRUD, uniqueness, and inventory semantics.
// Purpose: Exercise SqliteRegistryStore against a real on-disk database.
// Dependencies: dlp-core, dlp-store-sqlite, tempfile
// ============================================================================

//! Integration tests for the SQLite registry store.

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

use dlp_core::Classification;
use dlp_core::DataForm;
use dlp_core::DetectionInput;
use dlp_core::EntryVariantInput;
use dlp_core::InventoryRef;
use dlp_core::LocaleInput;
use dlp_core::PatternInput;
use dlp_core::PatternPatch;
use dlp_core::Registry;
use dlp_core::RegistryError;
use dlp_core::StorageType;
use dlp_core::UserEntryInput;
use dlp_store_sqlite::SqliteRegistryStore;

fn open_store() -> (tempfile::TempDir, SqliteRegistryStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteRegistryStore::open(&dir.path().join("registry.sqlite3")).expect("open");
    (dir, store)
}

fn sample_locale(store: &SqliteRegistryStore) -> dlp_core::LocaleId {
    store
        .create_locale(LocaleInput {
            stable_id: "en-US".to_string(),
            display_name: "English (US)".to_string(),
            description: None,
            priority: 0,
        })
        .expect("create_locale")
        .id
}

#[test]
fn create_pattern_enforces_uniqueness() {
    let (_dir, store) = open_store();
    let locale_id = sample_locale(&store);
    let input = PatternInput {
        locale_id,
        category: "financial".to_string(),
        pattern_type: "credit_card".to_string(),
        display_name: "Credit Card Number".to_string(),
        regex_source: Some(r"\d{4}-\d{4}-\d{4}-\d{4}".to_string()),
        regex_flags: None,
        recognizer_ref: None,
        validator_ref: Some("luhn".to_string()),
        default_classification: Classification::NeverShare,
        false_positive_hints: None,
        example_values: vec!["4111-1111-1111-1111".to_string()],
    };
    store.create_pattern(input.clone()).expect("first create succeeds");
    let err = store.create_pattern(input).expect_err("duplicate must fail");
    assert!(matches!(err, RegistryError::UniquenessViolation(_)));
}

#[test]
fn create_pattern_rejects_unknown_locale() {
    let (_dir, store) = open_store();
    let bogus_locale = dlp_core::LocaleId::from_raw(999).expect("nonzero");
    let err = store
        .create_pattern(PatternInput {
            locale_id: bogus_locale,
            category: "financial".to_string(),
            pattern_type: "credit_card".to_string(),
            display_name: "Credit Card Number".to_string(),
            regex_source: Some(r"\d+".to_string()),
            regex_flags: None,
            recognizer_ref: None,
            validator_ref: None,
            default_classification: Classification::NeverShare,
            false_positive_hints: None,
            example_values: Vec::new(),
        })
        .expect_err("must fail on missing locale");
    assert!(matches!(err, RegistryError::ForeignKeyViolation(_)));
}

#[test]
fn update_pattern_preserves_omitted_fields() {
    let (_dir, store) = open_store();
    let locale_id = sample_locale(&store);
    let pattern = store
        .create_pattern(PatternInput {
            locale_id,
            category: "financial".to_string(),
            pattern_type: "credit_card".to_string(),
            display_name: "Credit Card Number".to_string(),
            regex_source: Some(r"\d+".to_string()),
            regex_flags: None,
            recognizer_ref: None,
            validator_ref: None,
            default_classification: Classification::NeverShare,
            false_positive_hints: None,
            example_values: Vec::new(),
        })
        .expect("create");
    let updated = store
        .update_pattern(pattern.id, PatternPatch { active: Some(false), ..PatternPatch::default() })
        .expect("update");
    assert!(!updated.active);
    assert_eq!(updated.display_name, "Credit Card Number");
    assert_eq!(updated.regex_source.as_deref(), Some(r"\d+"));
}

#[test]
fn create_entry_with_variants_then_list_active() {
    let (_dir, store) = open_store();
    let entry = store
        .create_entry(UserEntryInput {
            label: "ceo-email".to_string(),
            display_name: "CEO Email".to_string(),
            primary_value: "ceo@example.com".to_string(),
            classification: Classification::AskFirst,
            category: "pii".to_string(),
            notes: None,
            variants: vec![EntryVariantInput { variant_text: "the boss".to_string(), variant_type: None }],
        })
        .expect("create_entry");
    let active = store.list_active_entries().expect("list_active_entries");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].0.id, entry.id);
    assert_eq!(active[0].1.len(), 1);
    assert_eq!(active[0].1[0].variant_type, "alias");
}

#[test]
fn duplicate_entry_label_is_rejected() {
    let (_dir, store) = open_store();
    let input = UserEntryInput {
        label: "ceo-email".to_string(),
        display_name: "CEO Email".to_string(),
        primary_value: "ceo@example.com".to_string(),
        classification: Classification::AskFirst,
        category: "pii".to_string(),
        notes: None,
        variants: Vec::new(),
    };
    store.create_entry(input.clone()).expect("first succeeds");
    let err = store.create_entry(input).expect_err("duplicate label must fail");
    assert!(matches!(err, RegistryError::UniquenessViolation(_)));
}

#[test]
fn record_detection_upserts_by_unique_key() {
    let (_dir, store) = open_store();
    let entry = store
        .create_entry(UserEntryInput {
            label: "ceo-email".to_string(),
            display_name: "CEO Email".to_string(),
            primary_value: "ceo@example.com".to_string(),
            classification: Classification::AskFirst,
            category: "pii".to_string(),
            notes: None,
            variants: Vec::new(),
        })
        .expect("create_entry");
    let input = DetectionInput {
        reference: InventoryRef::UserEntry { ref_id: entry.id.get() },
        ref_label: "ceo-email".to_string(),
        storage_location: "/tmp/notes.txt".to_string(),
        storage_type: StorageType::File,
        data_form: DataForm::Verbatim,
        detector_name: "entry_scanner".to_string(),
        current_classification: Classification::AskFirst,
    };
    let first = store.record_detection(input.clone()).expect("first detection");
    let second = store.record_detection(input).expect("second detection upserts");
    assert_eq!(first.id, second.id);

    let posture_input = store.get_posture_input().expect("posture input");
    assert_eq!(posture_input.ask_first_count, 1);
    assert_eq!(posture_input.total_active, 1);

    let cleared = store.clear_inventory_by_location("/tmp/notes.txt", "tester").expect("clear");
    assert_eq!(cleared, 1);
    let posture_after = store.get_posture_input().expect("posture input after clear");
    assert_eq!(posture_after.total_active, 0);
}

#[test]
fn deactivate_inventory_unknown_id_not_found() {
    let (_dir, store) = open_store();
    let bogus = dlp_core::InventoryId::from_raw(42).expect("nonzero");
    let err = store.deactivate_inventory(bogus, "tester").expect_err("must fail");
    assert!(matches!(err, RegistryError::NotFound(_)));
}
