// crates/dlp-core/src/interfaces/mod.rs
// ============================================================================
// Module: DLP Watchdog Interfaces
// Description: Backend-agnostic interfaces for the registry, scanner, agent, and decision log.
// Purpose: Define the contract surfaces implemented by dlp-store-sqlite, dlp-scanner, dlp-agent.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the gateway hook integrates with its three
//! collaborators without embedding storage, regex-engine, or HTTP-client
//! details. Implementations must fail closed: registry errors surface,
//! scanner errors become error-verdicts, agent errors are always absorbed
//! with a fallback.
//!
//! Security posture: implementations consume untrusted scan content; see
//! the threat-model notes in `SPEC_FULL.md`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Classification;
use crate::core::DecisionLogFilter;
use crate::core::DecisionLogRecord;
use crate::core::DecisionLogStats;
use crate::core::DetectionInput;
use crate::core::EntryId;
use crate::core::EntryVariant;
use crate::core::EntryVariantInput;
use crate::core::InventoryId;
use crate::core::InventoryRecord;
use crate::core::Locale;
use crate::core::LocaleInput;
use crate::core::Pattern;
use crate::core::PatternFilter;
use crate::core::PatternId;
use crate::core::PatternInput;
use crate::core::PatternPatch;
use crate::core::PostureInput;
use crate::core::RegistryHealth;
use crate::core::ScanResult;
use crate::core::UserEntry;
use crate::core::UserEntryInput;
use crate::core::VariantId;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Caller input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Referenced id does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint was violated.
    #[error("uniqueness violation: {0}")]
    UniquenessViolation(String),
    /// A foreign key reference was invalid.
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    /// The underlying store is unavailable.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// Persisted catalog of patterns, entries, variants, and inventory.
pub trait Registry {
    /// Creates a new locale.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the underlying store fails.
    fn create_locale(&self, input: LocaleInput) -> Result<Locale, RegistryError>;

    /// Creates a new pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when `input.locale_id` is unknown,
    /// [`RegistryError::UniquenessViolation`] when `(locale, category, type)`
    /// collides, or a storage error otherwise.
    fn create_pattern(&self, input: PatternInput) -> Result<Pattern, RegistryError>;

    /// Applies a partial update to a pattern; omitted fields stay unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when `id` is unknown, or a storage
    /// error otherwise.
    fn update_pattern(&self, id: PatternId, patch: PatternPatch) -> Result<Pattern, RegistryError>;

    /// Lists patterns matching the filter, insertion-stable by id ascending.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the underlying store fails.
    fn list_patterns(&self, filter: PatternFilter) -> Result<Vec<Pattern>, RegistryError>;

    /// Deactivates a pattern, preserving the row for audit.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when `id` is unknown, or a storage
    /// error otherwise.
    fn deactivate_pattern(&self, id: PatternId) -> Result<(), RegistryError>;

    /// Transactionally creates an entry and its initial variants.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UniquenessViolation`] when `input.label`
    /// collides, or a storage error otherwise.
    fn create_entry(&self, input: UserEntryInput) -> Result<UserEntry, RegistryError>;

    /// Adds a variant to an entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when `entry_id` is unknown,
    /// [`RegistryError::UniquenessViolation`] when `(entry, text)` collides,
    /// or a storage error otherwise.
    fn add_variant(
        &self,
        entry_id: EntryId,
        input: EntryVariantInput,
    ) -> Result<EntryVariant, RegistryError>;

    /// Removes a variant by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when `variant_id` is unknown, or a
    /// storage error otherwise.
    fn remove_variant(&self, variant_id: VariantId) -> Result<(), RegistryError>;

    /// Lists active entries with their variants, for scanner initialization.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the underlying store fails.
    fn list_active_entries(&self) -> Result<Vec<(UserEntry, Vec<EntryVariant>)>, RegistryError>;

    /// Lists active patterns, for scanner initialization.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the underlying store fails.
    fn list_active_patterns(&self) -> Result<Vec<Pattern>, RegistryError>;

    /// Inserts or refreshes an inventory row, keyed by `(ref_type, ref_id,
    /// storage_location)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the underlying store fails.
    fn record_detection(&self, input: DetectionInput) -> Result<InventoryRecord, RegistryError>;

    /// Deactivates an inventory row, stamping `deactivated_at`/`deactivated_by`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when `id` is unknown, or a storage
    /// error otherwise.
    fn deactivate_inventory(&self, id: InventoryId, actor: &str) -> Result<(), RegistryError>;

    /// Bulk-deactivates all active inventory rows at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the underlying store fails.
    fn clear_inventory_by_location(
        &self,
        location: &str,
        actor: &str,
    ) -> Result<u64, RegistryError>;

    /// Returns active-inventory counts per classification tier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the underlying store fails.
    fn get_posture_input(&self) -> Result<PostureInput, RegistryError>;

    /// Returns an aggregate health snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the underlying store fails.
    fn get_health(&self) -> Result<RegistryHealth, RegistryError>;
}

// ============================================================================
// SECTION: Pattern Scanner
// ============================================================================

/// Scanner errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A regex engine or internal scanner failure occurred mid-scan.
    #[error("scan error: {0}")]
    Internal(String),
    /// The scan exceeded `max_scan_time_ms`.
    #[error("scan exceeded time budget of {limit_ms}ms")]
    TimeBudgetExceeded {
        /// Configured time budget, in milliseconds.
        limit_ms: u64,
    },
    /// The registry could not be read to (re)build the detector set.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Deterministic regex + exact-substring detector over registry content.
pub trait Scanner {
    /// Runs the scanner over `text`, optionally restricted to a single
    /// locale's patterns.
    ///
    /// Per the scanner's own failure semantics this never returns `Err`; a
    /// scan that fails internally is represented by
    /// [`crate::core::Verdict::Error`] inside the returned [`ScanResult`].
    /// [`ScanError`] is reserved for [`Scanner::reload`] failures.
    fn scan(&self, text: &str, locale: Option<&str>) -> ScanResult;

    /// Rebuilds the detector set from the registry under an atomic swap.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] when the registry cannot be read.
    fn reload(&self) -> Result<(), ScanError>;

    /// Returns the pattern types that failed to compile at the last
    /// successful load, with their reasons.
    fn compile_failures(&self) -> Vec<(String, String)>;
}

// ============================================================================
// SECTION: Security Agent
// ============================================================================

/// Agent errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; callers of
///   [`SecurityAgent::analyze`] never see these directly because agent
///   failures are absorbed into a fail-closed [`crate::core::AgentOutcome`].
#[derive(Debug, Error)]
pub enum AgentError {
    /// The language-model service could not be reached or timed out.
    #[error("agent unavailable: {0}")]
    Unavailable(String),
    /// The language-model response could not be parsed.
    #[error("agent response parse error: {0}")]
    ParseError(String),
}

/// Contextual re-classification of scanner flags via an external LM.
pub trait SecurityAgent {
    /// Analyzes every flag in `scan_result` against `content`, returning one
    /// [`crate::core::FlagAnalysis`] per flag. Never returns `Err`: failures
    /// are absorbed into a fail-closed fallback per flag.
    fn analyze(&self, content: &str, scan_result: &ScanResult) -> crate::core::AgentOutcome;

    /// Issues a lightweight connectivity probe against the model service.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the probe fails or times out.
    fn test_connection(&self) -> Result<u64, AgentError>;
}

/// Clamps a raw confidence value into `[0.0, 1.0]`.
#[must_use]
pub fn clamp_confidence(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Normalizes a raw classification label, falling back to
/// [`Classification::AskFirst`] for unknown input per the agent's
/// normalization policy.
#[must_use]
pub fn normalize_classification(raw: &str) -> Classification {
    Classification::parse_normalized(raw).unwrap_or(Classification::AskFirst)
}

// ============================================================================
// SECTION: Decision Log
// ============================================================================

/// Decision log errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LogError {
    /// Schema initialization failed; fatal and propagates to the caller.
    #[error("decision log schema error: {0}")]
    Schema(String),
    /// A per-write error occurred; the pending batch is left intact for retry.
    #[error("decision log write error: {0}")]
    Write(String),
    /// A query failed.
    #[error("decision log query error: {0}")]
    Query(String),
    /// File export/logging failed. Non-fatal by policy; callers may choose to
    /// surface or swallow this.
    #[error("decision log file error: {0}")]
    File(String),
}

/// Append-only, queryable audit trail.
pub trait DecisionLog {
    /// Appends a record to the pending batch, auto-flushing when the batch
    /// reaches `batch_size`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Write`] when the write fails; the pending batch is
    /// left intact for retry.
    fn record(&self, record: DecisionLogRecord) -> Result<(), LogError>;

    /// Drains the pending batch immediately, in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Write`] when the flush fails.
    fn flush(&self) -> Result<(), LogError>;

    /// Flushes then appends a `system_shutdown` record.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Write`] when the flush fails.
    fn close(&self) -> Result<(), LogError>;

    /// Queries the ledger with pagination and ordering.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Query`] when the query fails.
    fn query(&self, filter: DecisionLogFilter) -> Result<Vec<DecisionLogRecord>, LogError>;

    /// Computes aggregate statistics, optionally windowed by `filter`'s
    /// `start_time`/`end_time`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Query`] when the query fails.
    fn stats(&self, filter: DecisionLogFilter) -> Result<DecisionLogStats, LogError>;

    /// Writes matching rows as JSON Lines, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::File`] when the file cannot be written.
    fn export_to_file(&self, path: &std::path::Path, filter: DecisionLogFilter) -> Result<u64, LogError>;

    /// Deletes rows older than `retention_days`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Write`] when the purge fails.
    fn purge_old_entries(&self, retention_days: u32) -> Result<u64, LogError>;
}
