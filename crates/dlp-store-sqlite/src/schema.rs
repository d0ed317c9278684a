// crates/dlp-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Schema Bootstrap
// Description: Connection pragmas and schema initialization shared by the registry and decision log.
// Purpose: Open a WAL-mode SQLite connection and create the DLP watchdog tables idempotently.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! Both [`crate::registry_store::SqliteRegistryStore`] and
//! [`crate::decision_log_store::SqliteDecisionLog`] open their own connection
//! against (typically) the same database file and bootstrap the full schema,
//! so either can be constructed independently. Bootstrap is idempotent:
//! `CREATE TABLE IF NOT EXISTS` inside a single transaction, version-stamped
//! via a `store_meta` table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::error::SqliteStoreError;

/// Schema version for the DLP watchdog store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout, in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Opens a `SQLite` connection with WAL journaling, foreign keys, and a busy
/// timeout, then bootstraps the schema if needed.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the connection cannot be opened or the
/// schema cannot be initialized.
pub fn open_and_initialize(path: &Path) -> Result<Connection, SqliteStoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
    }
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let mut connection =
        Connection::open_with_flags(path, flags).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection)?;
    initialize_schema(&mut connection)?;
    Ok(connection)
}

/// Applies durability pragmas required by the spec's WAL + busy-timeout model.
fn apply_pragmas(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Creates every table named in the spec's external interface section, if
/// absent, and records the schema version in `store_meta`.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    if version.is_none() {
        tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    } else if version != Some(SCHEMA_VERSION) {
        return Err(SqliteStoreError::VersionMismatch(format!(
            "unsupported schema version: {}",
            version.unwrap_or_default()
        )));
    }
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS locales (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stable_id TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            description TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            priority INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS patterns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            locale_id INTEGER NOT NULL REFERENCES locales(id),
            category TEXT NOT NULL,
            pattern_type TEXT NOT NULL,
            display_name TEXT NOT NULL,
            regex_source TEXT,
            regex_flags TEXT,
            recognizer_ref TEXT,
            validator_ref TEXT,
            default_classification TEXT NOT NULL,
            false_positive_hints TEXT,
            example_values TEXT NOT NULL DEFAULT '[]',
            active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (locale_id, category, pattern_type)
        );
        CREATE INDEX IF NOT EXISTS idx_patterns_locale_active ON patterns (locale_id, active);
        CREATE TABLE IF NOT EXISTS user_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            primary_value TEXT NOT NULL,
            classification TEXT NOT NULL,
            category TEXT NOT NULL,
            notes TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS entry_variants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id INTEGER NOT NULL REFERENCES user_entries(id) ON DELETE CASCADE,
            variant_text TEXT NOT NULL,
            variant_type TEXT NOT NULL DEFAULT 'alias',
            created_at INTEGER NOT NULL,
            UNIQUE (entry_id, variant_text)
        );
        CREATE TABLE IF NOT EXISTS inventory (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ref_type TEXT NOT NULL,
            ref_id INTEGER NOT NULL,
            ref_label TEXT NOT NULL,
            storage_location TEXT NOT NULL,
            storage_type TEXT NOT NULL,
            data_form TEXT NOT NULL,
            detector_name TEXT NOT NULL,
            current_classification TEXT NOT NULL,
            first_detected_at INTEGER NOT NULL,
            last_verified_at INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            deactivated_at INTEGER,
            deactivated_by TEXT,
            UNIQUE (ref_type, ref_id, storage_location)
        );
        CREATE INDEX IF NOT EXISTS idx_inventory_active ON inventory (active, current_classification);
        CREATE INDEX IF NOT EXISTS idx_inventory_location ON inventory (storage_location);
        CREATE TABLE IF NOT EXISTS decision_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            decision_type TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            request_id TEXT,
            session_key TEXT,
            action TEXT,
            verdict TEXT,
            destination TEXT,
            target TEXT,
            content_hash TEXT,
            content_length INTEGER,
            flag_count INTEGER,
            highest_classification TEXT,
            duration_ms INTEGER,
            operator TEXT,
            reason TEXT,
            previous_state TEXT,
            new_state TEXT,
            quarantine_id TEXT,
            flag_details TEXT,
            metadata TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_decision_log_timestamp ON decision_log (timestamp);
        CREATE INDEX IF NOT EXISTS idx_decision_log_type ON decision_log (decision_type);
        CREATE INDEX IF NOT EXISTS idx_decision_log_action ON decision_log (action);
        CREATE INDEX IF NOT EXISTS idx_decision_log_session ON decision_log (session_key);
        CREATE INDEX IF NOT EXISTS idx_decision_log_request ON decision_log (request_id);
        CREATE VIEW IF NOT EXISTS v_posture_input AS
            SELECT current_classification, COUNT(1) AS active_count
            FROM inventory
            WHERE active = 1
            GROUP BY current_classification;",
    )
    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
