// crates/dlp-store-sqlite/src/registry_store.rs
// ============================================================================
// Module: SQLite Registry Store
// Description: Durable Registry implementation backed by SQLite WAL.
// Purpose: Persist locales, patterns, user entries, variants, and inventory.
// Dependencies: dlp-core, rusqlite
// ============================================================================

//! ## Overview
//! [`SqliteRegistryStore`] implements [`Registry`] against a single shared
//! connection guarded by a mutex. The spec's concurrency model calls for a
//! single logical writer with readers permitted to overlap; a single
//! connection under WAL journaling satisfies that without the multi-reader
//! pool a higher-throughput store would need.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroU64;
use std::path::Path;
use std::sync::Mutex;

use dlp_core::Classification;
use dlp_core::DataForm;
use dlp_core::DetectionInput;
use dlp_core::EntryId;
use dlp_core::EntryVariant;
use dlp_core::EntryVariantInput;
use dlp_core::InventoryId;
use dlp_core::InventoryRecord;
use dlp_core::InventoryRef;
use dlp_core::Locale;
use dlp_core::LocaleId;
use dlp_core::LocaleInput;
use dlp_core::Pattern;
use dlp_core::PatternFilter;
use dlp_core::PatternId;
use dlp_core::PatternInput;
use dlp_core::PatternPatch;
use dlp_core::PostureInput;
use dlp_core::Registry;
use dlp_core::RegistryError;
use dlp_core::RegistryHealth;
use dlp_core::StorageType;
use dlp_core::Timestamp;
use dlp_core::UserEntry;
use dlp_core::UserEntryInput;
use dlp_core::VariantId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;

use crate::schema;

/// Shared projection for pattern reads, denormalizing the owning locale's
/// stable id so the scanner can filter by locale without a join of its own.
const PATTERN_SELECT: &str = "SELECT patterns.id, patterns.locale_id, patterns.category, patterns.pattern_type,
    patterns.display_name, patterns.regex_source, patterns.regex_flags, patterns.recognizer_ref,
    patterns.validator_ref, patterns.default_classification, patterns.false_positive_hints,
    patterns.example_values, patterns.active, patterns.created_at, patterns.updated_at, locales.stable_id
    FROM patterns JOIN locales ON locales.id = patterns.locale_id";

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed [`Registry`].
pub struct SqliteRegistryStore {
    connection: Mutex<Connection>,
}

impl SqliteRegistryStore {
    /// Opens (creating if absent) the database at `path` and bootstraps its schema.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::StorageUnavailable`] when the database cannot
    /// be opened or its schema cannot be initialized.
    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        let connection = schema::open_and_initialize(path)
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        Ok(Self { connection: Mutex::new(connection) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, RegistryError> {
        self.connection.lock().map_err(|_| RegistryError::StorageUnavailable("connection mutex poisoned".into()))
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

fn classification_to_db(value: Classification) -> &'static str {
    value.as_str()
}

fn classification_from_db(raw: &str) -> Result<Classification, RegistryError> {
    Classification::parse_normalized(raw)
        .ok_or_else(|| RegistryError::StorageUnavailable(format!("corrupt classification: {raw}")))
}

fn storage_type_to_db(value: StorageType) -> &'static str {
    match value {
        StorageType::File => "file",
        StorageType::Session => "session",
        StorageType::Memory => "memory",
        StorageType::Context => "context",
    }
}

fn storage_type_from_db(raw: &str) -> Result<StorageType, RegistryError> {
    match raw {
        "file" => Ok(StorageType::File),
        "session" => Ok(StorageType::Session),
        "memory" => Ok(StorageType::Memory),
        "context" => Ok(StorageType::Context),
        other => Err(RegistryError::StorageUnavailable(format!("corrupt storage_type: {other}"))),
    }
}

fn data_form_to_db(value: DataForm) -> &'static str {
    match value {
        DataForm::Verbatim => "verbatim",
        DataForm::Paraphrased => "paraphrased",
        DataForm::Derived => "derived",
        DataForm::Reference => "reference",
    }
}

fn data_form_from_db(raw: &str) -> Result<DataForm, RegistryError> {
    match raw {
        "verbatim" => Ok(DataForm::Verbatim),
        "paraphrased" => Ok(DataForm::Paraphrased),
        "derived" => Ok(DataForm::Derived),
        "reference" => Ok(DataForm::Reference),
        other => Err(RegistryError::StorageUnavailable(format!("corrupt data_form: {other}"))),
    }
}

fn ref_type_to_db(value: InventoryRef) -> (&'static str, u64) {
    match value {
        InventoryRef::Pattern { ref_id } => ("pattern", ref_id),
        InventoryRef::UserEntry { ref_id } => ("user_entry", ref_id),
    }
}

fn ref_type_from_db(ref_type: &str, ref_id: u64) -> Result<InventoryRef, RegistryError> {
    match ref_type {
        "pattern" => Ok(InventoryRef::Pattern { ref_id }),
        "user_entry" => Ok(InventoryRef::UserEntry { ref_id }),
        other => Err(RegistryError::StorageUnavailable(format!("corrupt ref_type: {other}"))),
    }
}

fn row_to_locale(row: &Row<'_>) -> rusqlite::Result<(i64, String, String, Option<String>, bool, i64, i64, i64)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get::<_, i64>(4)? != 0,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn build_locale(raw: (i64, String, String, Option<String>, bool, i64, i64, i64)) -> Result<Locale, RegistryError> {
    let (id, stable_id, display_name, description, active, priority, created_at, updated_at) = raw;
    let id = LocaleId::from_raw(u64::try_from(id).unwrap_or_default())
        .ok_or_else(|| RegistryError::StorageUnavailable("non-positive locale id".into()))?;
    Ok(Locale {
        id,
        stable_id,
        display_name,
        description,
        active,
        priority,
        created_at: Timestamp::from_unix_millis(created_at),
        updated_at: Timestamp::from_unix_millis(updated_at),
    })
}

fn row_to_pattern(row: &Row<'_>) -> rusqlite::Result<Pattern> {
    let example_values_raw: String = row.get(11)?;
    let example_values: Vec<String> = serde_json::from_str(&example_values_raw).unwrap_or_default();
    let id: i64 = row.get(0)?;
    let locale_id: i64 = row.get(1)?;
    let default_classification: String = row.get(9)?;
    Ok(Pattern {
        id: PatternId::new(NonZeroU64::new(u64::try_from(id).unwrap_or(1)).unwrap_or(NonZeroU64::MIN)),
        locale_id: LocaleId::new(NonZeroU64::new(u64::try_from(locale_id).unwrap_or(1)).unwrap_or(NonZeroU64::MIN)),
        locale_stable_id: row.get(15)?,
        category: row.get(2)?,
        pattern_type: row.get(3)?,
        display_name: row.get(4)?,
        regex_source: row.get(5)?,
        regex_flags: row.get(6)?,
        recognizer_ref: row.get(7)?,
        validator_ref: row.get(8)?,
        default_classification: Classification::parse_normalized(&default_classification)
            .unwrap_or(Classification::AskFirst),
        false_positive_hints: row.get(10)?,
        example_values,
        active: row.get::<_, i64>(12)? != 0,
        created_at: Timestamp::from_unix_millis(row.get(13)?),
        updated_at: Timestamp::from_unix_millis(row.get(14)?),
    })
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<UserEntry> {
    let id: i64 = row.get(0)?;
    let classification: String = row.get(4)?;
    Ok(UserEntry {
        id: EntryId::new(NonZeroU64::new(u64::try_from(id).unwrap_or(1)).unwrap_or(NonZeroU64::MIN)),
        label: row.get(1)?,
        display_name: row.get(2)?,
        primary_value: row.get(3)?,
        classification: Classification::parse_normalized(&classification).unwrap_or(Classification::AskFirst),
        category: row.get(5)?,
        notes: row.get(6)?,
        active: row.get::<_, i64>(7)? != 0,
        created_at: Timestamp::from_unix_millis(row.get(8)?),
        updated_at: Timestamp::from_unix_millis(row.get(9)?),
    })
}

fn row_to_variant(row: &Row<'_>) -> rusqlite::Result<EntryVariant> {
    let id: i64 = row.get(0)?;
    let entry_id: i64 = row.get(1)?;
    Ok(EntryVariant {
        id: VariantId::new(NonZeroU64::new(u64::try_from(id).unwrap_or(1)).unwrap_or(NonZeroU64::MIN)),
        entry_id: EntryId::new(NonZeroU64::new(u64::try_from(entry_id).unwrap_or(1)).unwrap_or(NonZeroU64::MIN)),
        variant_text: row.get(2)?,
        variant_type: row.get(3)?,
        created_at: Timestamp::from_unix_millis(row.get(4)?),
    })
}

// ============================================================================
// SECTION: Registry Impl
// ============================================================================

impl Registry for SqliteRegistryStore {
    fn create_locale(&self, input: LocaleInput) -> Result<Locale, RegistryError> {
        let conn = self.lock()?;
        let now = Timestamp::now().as_unix_millis();
        conn.execute(
            "INSERT INTO locales (stable_id, display_name, description, active, priority, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)",
            params![input.stable_id, input.display_name, input.description, input.priority, now],
        )
        .map_err(|err| map_insert_error(&err, "locale stable_id"))?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, stable_id, display_name, description, active, priority, created_at, updated_at
             FROM locales WHERE id = ?1",
            params![id],
            row_to_locale,
        )
        .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))
        .and_then(build_locale)
    }

    fn create_pattern(&self, input: PatternInput) -> Result<Pattern, RegistryError> {
        let conn = self.lock()?;
        let now = Timestamp::now().as_unix_millis();
        let example_values = serde_json::to_string(&input.example_values).unwrap_or_else(|_| "[]".to_string());
        conn.execute(
            "INSERT INTO patterns (
                locale_id, category, pattern_type, display_name, regex_source, regex_flags,
                recognizer_ref, validator_ref, default_classification, false_positive_hints,
                example_values, active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?12, ?12)",
            params![
                i64::try_from(input.locale_id.get()).unwrap_or_default(),
                input.category,
                input.pattern_type,
                input.display_name,
                input.regex_source,
                input.regex_flags,
                input.recognizer_ref,
                input.validator_ref,
                classification_to_db(input.default_classification),
                input.false_positive_hints,
                example_values,
                now,
            ],
        )
        .map_err(|err| map_pattern_insert_error(&err))?;
        let id = conn.last_insert_rowid();
        fetch_pattern_by_id(&conn, id)
    }

    fn update_pattern(&self, id: PatternId, patch: PatternPatch) -> Result<Pattern, RegistryError> {
        let conn = self.lock()?;
        let existing = fetch_pattern_by_id(&conn, i64::try_from(id.get()).unwrap_or_default())?;
        let display_name = patch.display_name.unwrap_or(existing.display_name);
        let regex_source = patch.regex_source.or(existing.regex_source);
        let regex_flags = patch.regex_flags.or(existing.regex_flags);
        let recognizer_ref = patch.recognizer_ref.or(existing.recognizer_ref);
        let validator_ref = patch.validator_ref.or(existing.validator_ref);
        let default_classification = patch.default_classification.unwrap_or(existing.default_classification);
        let false_positive_hints = patch.false_positive_hints.or(existing.false_positive_hints);
        let example_values = patch.example_values.unwrap_or(existing.example_values);
        let active = patch.active.unwrap_or(existing.active);
        let now = Timestamp::now().as_unix_millis();
        let example_values_json = serde_json::to_string(&example_values).unwrap_or_else(|_| "[]".to_string());
        conn.execute(
            "UPDATE patterns SET display_name = ?1, regex_source = ?2, regex_flags = ?3, recognizer_ref = ?4,
                validator_ref = ?5, default_classification = ?6, false_positive_hints = ?7, example_values = ?8,
                active = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                display_name,
                regex_source,
                regex_flags,
                recognizer_ref,
                validator_ref,
                classification_to_db(default_classification),
                false_positive_hints,
                example_values_json,
                i64::from(active),
                now,
                i64::try_from(id.get()).unwrap_or_default(),
            ],
        )
        .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        fetch_pattern_by_id(&conn, i64::try_from(id.get()).unwrap_or_default())
    }

    fn list_patterns(&self, filter: PatternFilter) -> Result<Vec<Pattern>, RegistryError> {
        let conn = self.lock()?;
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(locale_id) = filter.locale_id {
            clauses.push(format!("patterns.locale_id = ?{}", values.len() + 1));
            values.push(Box::new(i64::try_from(locale_id.get()).unwrap_or_default()));
        }
        if let Some(category) = filter.category {
            clauses.push(format!("patterns.category = ?{}", values.len() + 1));
            values.push(Box::new(category));
        }
        if let Some(active) = filter.active {
            clauses.push(format!("patterns.active = ?{}", values.len() + 1));
            values.push(Box::new(i64::from(active)));
        }
        let where_clause = if clauses.is_empty() { String::new() } else { format!("WHERE {}", clauses.join(" AND ")) };
        let sql = format!("{PATTERN_SELECT} {where_clause} ORDER BY patterns.id ASC");
        let mut stmt = conn.prepare(&sql).map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(std::convert::AsRef::as_ref).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_pattern)
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(|err| RegistryError::StorageUnavailable(err.to_string()))
    }

    fn deactivate_pattern(&self, id: PatternId) -> Result<(), RegistryError> {
        let conn = self.lock()?;
        let now = Timestamp::now().as_unix_millis();
        let changed = conn
            .execute(
                "UPDATE patterns SET active = 0, updated_at = ?1 WHERE id = ?2",
                params![now, i64::try_from(id.get()).unwrap_or_default()],
            )
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        if changed == 0 {
            return Err(RegistryError::NotFound(format!("pattern {id}")));
        }
        Ok(())
    }

    fn create_entry(&self, input: UserEntryInput) -> Result<UserEntry, RegistryError> {
        let mut conn = self.lock()?;
        let now = Timestamp::now().as_unix_millis();
        let tx = conn.transaction().map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        tx.execute(
            "INSERT INTO user_entries (
                label, display_name, primary_value, classification, category, notes, active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)",
            params![
                input.label,
                input.display_name,
                input.primary_value,
                classification_to_db(input.classification),
                input.category,
                input.notes,
                now,
            ],
        )
        .map_err(|err| map_entry_insert_error(&err))?;
        let entry_id = tx.last_insert_rowid();
        for variant in &input.variants {
            let variant_type = variant.variant_type.clone().unwrap_or_else(|| "alias".to_string());
            tx.execute(
                "INSERT INTO entry_variants (entry_id, variant_text, variant_type, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entry_id, variant.variant_text, variant_type, now],
            )
            .map_err(|err| map_variant_insert_error(&err))?;
        }
        let entry = tx
            .query_row(
                "SELECT id, label, display_name, primary_value, classification, category, notes, active,
                    created_at, updated_at
                 FROM user_entries WHERE id = ?1",
                params![entry_id],
                row_to_entry,
            )
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        tx.commit().map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        Ok(entry)
    }

    fn add_variant(&self, entry_id: EntryId, input: EntryVariantInput) -> Result<EntryVariant, RegistryError> {
        let conn = self.lock()?;
        let raw_entry_id = i64::try_from(entry_id.get()).unwrap_or_default();
        let exists: Option<i64> = conn
            .query_row("SELECT id FROM user_entries WHERE id = ?1", params![raw_entry_id], |row| row.get(0))
            .optional()
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        if exists.is_none() {
            return Err(RegistryError::NotFound(format!("entry {entry_id}")));
        }
        let now = Timestamp::now().as_unix_millis();
        let variant_type = input.variant_type.unwrap_or_else(|| "alias".to_string());
        conn.execute(
            "INSERT INTO entry_variants (entry_id, variant_text, variant_type, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![raw_entry_id, input.variant_text, variant_type, now],
        )
        .map_err(|err| map_variant_insert_error(&err))?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, entry_id, variant_text, variant_type, created_at FROM entry_variants WHERE id = ?1",
            params![id],
            row_to_variant,
        )
        .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))
    }

    fn remove_variant(&self, variant_id: VariantId) -> Result<(), RegistryError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "DELETE FROM entry_variants WHERE id = ?1",
                params![i64::try_from(variant_id.get()).unwrap_or_default()],
            )
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        if changed == 0 {
            return Err(RegistryError::NotFound(format!("variant {variant_id}")));
        }
        Ok(())
    }

    fn list_active_entries(&self) -> Result<Vec<(UserEntry, Vec<EntryVariant>)>, RegistryError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, label, display_name, primary_value, classification, category, notes, active,
                    created_at, updated_at
                 FROM user_entries WHERE active = 1 ORDER BY id ASC",
            )
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        let entries = stmt
            .query_map(params![], row_to_entry)
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        let mut result = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut vstmt = conn
                .prepare(
                    "SELECT id, entry_id, variant_text, variant_type, created_at FROM entry_variants
                     WHERE entry_id = ?1 ORDER BY id ASC",
                )
                .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
            let variants = vstmt
                .query_map(params![i64::try_from(entry.id.get()).unwrap_or_default()], row_to_variant)
                .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
            result.push((entry, variants));
        }
        Ok(result)
    }

    fn list_active_patterns(&self) -> Result<Vec<Pattern>, RegistryError> {
        self.list_patterns(PatternFilter { active: Some(true), ..PatternFilter::default() })
    }

    fn record_detection(&self, input: DetectionInput) -> Result<InventoryRecord, RegistryError> {
        let conn = self.lock()?;
        let now = Timestamp::now().as_unix_millis();
        let (ref_type, ref_id) = ref_type_to_db(input.reference);
        conn.execute(
            "INSERT INTO inventory (
                ref_type, ref_id, ref_label, storage_location, storage_type, data_form, detector_name,
                current_classification, first_detected_at, last_verified_at, active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, 1)
            ON CONFLICT (ref_type, ref_id, storage_location) DO UPDATE SET
                ref_label = excluded.ref_label,
                storage_type = excluded.storage_type,
                data_form = excluded.data_form,
                detector_name = excluded.detector_name,
                current_classification = excluded.current_classification,
                last_verified_at = excluded.last_verified_at,
                active = 1,
                deactivated_at = NULL,
                deactivated_by = NULL",
            params![
                ref_type,
                i64::try_from(ref_id).unwrap_or_default(),
                input.ref_label,
                input.storage_location,
                storage_type_to_db(input.storage_type),
                data_form_to_db(input.data_form),
                input.detector_name,
                classification_to_db(input.current_classification),
                now,
            ],
        )
        .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        conn.query_row(
            "SELECT id, ref_type, ref_id, ref_label, storage_location, storage_type, data_form, detector_name,
                current_classification, first_detected_at, last_verified_at, active, deactivated_at, deactivated_by
             FROM inventory WHERE ref_type = ?1 AND ref_id = ?2 AND storage_location = ?3",
            params![ref_type, i64::try_from(ref_id).unwrap_or_default(), input.storage_location],
            row_to_inventory,
        )
        .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?
    }

    fn deactivate_inventory(&self, id: InventoryId, actor: &str) -> Result<(), RegistryError> {
        let conn = self.lock()?;
        let now = Timestamp::now().as_unix_millis();
        let changed = conn
            .execute(
                "UPDATE inventory SET active = 0, deactivated_at = ?1, deactivated_by = ?2 WHERE id = ?3",
                params![now, actor, i64::try_from(id.get()).unwrap_or_default()],
            )
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        if changed == 0 {
            return Err(RegistryError::NotFound(format!("inventory {id}")));
        }
        Ok(())
    }

    fn clear_inventory_by_location(&self, location: &str, actor: &str) -> Result<u64, RegistryError> {
        let conn = self.lock()?;
        let now = Timestamp::now().as_unix_millis();
        let changed = conn
            .execute(
                "UPDATE inventory SET active = 0, deactivated_at = ?1, deactivated_by = ?2
                 WHERE storage_location = ?3 AND active = 1",
                params![now, actor, location],
            )
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        Ok(u64::try_from(changed).unwrap_or_default())
    }

    fn get_posture_input(&self) -> Result<PostureInput, RegistryError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT current_classification, active_count FROM v_posture_input")
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        let rows = stmt
            .query_map(params![], |row| {
                let classification: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((classification, count))
            })
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        let mut input = PostureInput::default();
        for row in rows {
            let (classification, count) = row.map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
            let count = u64::try_from(count).unwrap_or_default();
            match classification_from_db(&classification)? {
                Classification::NeverShare => input.never_share_count = count,
                Classification::AskFirst => input.ask_first_count = count,
                Classification::InternalOnly => input.internal_only_count = count,
                Classification::Public => input.public_count = count,
            }
            input.total_active += count;
        }
        Ok(input)
    }

    fn get_health(&self) -> Result<RegistryHealth, RegistryError> {
        let conn = self.lock()?;
        let pattern_count: i64 = conn
            .query_row("SELECT COUNT(1) FROM patterns", params![], |row| row.get(0))
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        let entry_count: i64 = conn
            .query_row("SELECT COUNT(1) FROM user_entries", params![], |row| row.get(0))
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        let active_inventory_count: i64 = conn
            .query_row("SELECT COUNT(1) FROM inventory WHERE active = 1", params![], |row| row.get(0))
            .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?;
        Ok(RegistryHealth {
            pattern_count: u64::try_from(pattern_count).unwrap_or_default(),
            entry_count: u64::try_from(entry_count).unwrap_or_default(),
            active_inventory_count: u64::try_from(active_inventory_count).unwrap_or_default(),
            ok: true,
        })
    }
}

fn row_to_inventory(row: &Row<'_>) -> rusqlite::Result<Result<InventoryRecord, RegistryError>> {
    let id: i64 = row.get(0)?;
    let ref_type: String = row.get(1)?;
    let ref_id: i64 = row.get(2)?;
    let storage_type: String = row.get(5)?;
    let data_form: String = row.get(6)?;
    let classification: String = row.get(8)?;
    let deactivated_at: Option<i64> = row.get(12)?;
    let ref_label: String = row.get(3)?;
    let storage_location: String = row.get(4)?;
    let detector_name: String = row.get(7)?;
    let first_detected_at_raw: i64 = row.get(9)?;
    let last_verified_at_raw: i64 = row.get(10)?;
    let active_raw: i64 = row.get(11)?;
    let deactivated_by: Option<String> = row.get(13)?;
    let built = (|| {
        Ok(InventoryRecord {
            id: InventoryId::from_raw(u64::try_from(id).unwrap_or_default())
                .ok_or_else(|| RegistryError::StorageUnavailable("non-positive inventory id".into()))?,
            reference: ref_type_from_db(&ref_type, u64::try_from(ref_id).unwrap_or_default())?,
            ref_label,
            storage_location,
            storage_type: storage_type_from_db(&storage_type)?,
            data_form: data_form_from_db(&data_form)?,
            detector_name,
            current_classification: classification_from_db(&classification)?,
            first_detected_at: Timestamp::from_unix_millis(first_detected_at_raw),
            last_verified_at: Timestamp::from_unix_millis(last_verified_at_raw),
            active: active_raw != 0,
            deactivated_at: deactivated_at.map(Timestamp::from_unix_millis),
            deactivated_by,
        })
    })();
    Ok(built)
}

fn fetch_pattern_by_id(conn: &Connection, id: i64) -> Result<Pattern, RegistryError> {
    conn.query_row(&format!("{PATTERN_SELECT} WHERE patterns.id = ?1"), params![id], row_to_pattern)
        .optional()
        .map_err(|err| RegistryError::StorageUnavailable(err.to_string()))?
        .ok_or_else(|| RegistryError::NotFound(format!("pattern {id}")))
}

fn map_insert_error(err: &rusqlite::Error, context: &str) -> RegistryError {
    if is_uniqueness_violation(err) {
        RegistryError::UniquenessViolation(context.to_string())
    } else {
        RegistryError::StorageUnavailable(err.to_string())
    }
}

fn map_pattern_insert_error(err: &rusqlite::Error) -> RegistryError {
    if is_uniqueness_violation(err) {
        RegistryError::UniquenessViolation("(locale, category, pattern_type)".to_string())
    } else if is_foreign_key_violation(err) {
        RegistryError::ForeignKeyViolation("locale_id".to_string())
    } else {
        RegistryError::StorageUnavailable(err.to_string())
    }
}

fn map_entry_insert_error(err: &rusqlite::Error) -> RegistryError {
    map_insert_error(err, "entry label")
}

fn map_variant_insert_error(err: &rusqlite::Error) -> RegistryError {
    if is_uniqueness_violation(err) {
        RegistryError::UniquenessViolation("(entry, variant_text)".to_string())
    } else if is_foreign_key_violation(err) {
        RegistryError::ForeignKeyViolation("entry_id".to_string())
    } else {
        RegistryError::StorageUnavailable(err.to_string())
    }
}

fn is_uniqueness_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == rusqlite::ErrorCode::ConstraintViolation
            && inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == rusqlite::ErrorCode::ConstraintViolation
            && inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}
