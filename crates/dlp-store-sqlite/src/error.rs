// crates/dlp-store-sqlite/src/error.rs
// ============================================================================
// Module: SQLite Store Error
// Description: Internal error type bridging rusqlite failures into the dlp-core error taxonomy.
// Purpose: Give schema bootstrap and the store implementations one error type to propagate.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`SqliteStoreError`] is an internal detail of this crate; callers observe
//! `dlp-core`'s `RegistryError` / `LogError` instead. Conversions live beside
//! the call sites that need them.

use thiserror::Error;

/// Internal error produced while opening or bootstrapping the store.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// A database-level failure (open, pragma, query, transaction).
    #[error("sqlite error: {0}")]
    Db(String),
    /// A filesystem failure while preparing the database path.
    #[error("io error: {0}")]
    Io(String),
    /// The on-disk schema version does not match what this crate expects.
    #[error("schema version mismatch: {0}")]
    VersionMismatch(String),
}
