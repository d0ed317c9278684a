// crates/dlp-store-sqlite/src/lib.rs
// ============================================================================
// Module: DLP Watchdog SQLite Store
// Description: Durable Registry and DecisionLog implementations backed by SQLite.
// Purpose: Give the registry and decision logger a single-file, WAL-journaled backend.
// Dependencies: dlp-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `dlp-store-sqlite` provides [`SqliteRegistryStore`] (implementing
//! [`dlp_core::Registry`]) and [`SqliteDecisionLog`] (implementing
//! [`dlp_core::DecisionLog`]). Both bootstrap the same schema independently,
//! so either can be pointed at its own database file or share one.

pub mod decision_log_store;
pub mod error;
pub mod registry_store;
pub mod schema;

pub use decision_log_store::SqliteDecisionLog;
pub use error::SqliteStoreError;
pub use registry_store::SqliteRegistryStore;
