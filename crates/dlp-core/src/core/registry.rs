// crates/dlp-core/src/core/registry.rs
// ============================================================================
// Module: DLP Watchdog Registry Domain Types
// Description: Locales, patterns, user entries, variants, and inventory records.
// Purpose: Define the persisted catalog of sensitive-data detectors and sightings.
// Dependencies: crate::core::classification, crate::core::identifiers, crate::core::time, serde
// ============================================================================

//! ## Overview
//! The registry is the persisted catalog backing the scanner and the
//! inventory ledger. Every type here is a plain record; CRUD semantics and
//! uniqueness enforcement live behind the [`crate::interfaces::Registry`]
//! trait and its storage-backed implementations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::classification::Classification;
use crate::core::identifiers::EntryId;
use crate::core::identifiers::InventoryId;
use crate::core::identifiers::LocaleId;
use crate::core::identifiers::PatternId;
use crate::core::identifiers::VariantId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Locale
// ============================================================================

/// Scoping namespace for patterns.
///
/// # Invariants
/// - `stable_id` is unique across the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    /// Surrogate identifier.
    pub id: LocaleId,
    /// Stable string identifier (e.g. `en-US`).
    pub stable_id: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Whether the locale is active.
    pub active: bool,
    /// Priority; larger wins on ties elsewhere.
    pub priority: i64,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last update timestamp.
    pub updated_at: Timestamp,
}

/// Input for creating a locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleInput {
    /// Stable string identifier.
    pub stable_id: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Priority; larger wins on ties elsewhere.
    pub priority: i64,
}

// ============================================================================
// SECTION: Pattern
// ============================================================================

/// A named detector within a locale.
///
/// # Invariants
/// - `(locale_id, category, pattern_type)` is unique.
/// - At least one of `regex_source` or `recognizer_ref` must be present for
///   the pattern to be usable by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Surrogate identifier.
    pub id: PatternId,
    /// Owning locale.
    pub locale_id: LocaleId,
    /// Denormalized stable id of the owning locale, for scanner locale
    /// filtering without a join.
    pub locale_stable_id: String,
    /// Free-text grouping category (e.g. `financial`).
    pub category: String,
    /// Pattern type, unique within `(locale, category)`.
    pub pattern_type: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Optional regex source.
    pub regex_source: Option<String>,
    /// Optional regex flags (e.g. `i` for case-insensitive).
    pub regex_flags: Option<String>,
    /// Optional reference to a named external recognizer.
    pub recognizer_ref: Option<String>,
    /// Optional reference to a named validator (e.g. `luhn`).
    pub validator_ref: Option<String>,
    /// Classification applied to matches when no override exists.
    pub default_classification: Classification,
    /// Optional hints describing known false positives.
    pub false_positive_hints: Option<String>,
    /// Optional example values for documentation/testing.
    pub example_values: Vec<String>,
    /// Whether the pattern is active.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last update timestamp.
    pub updated_at: Timestamp,
}

/// Input for creating a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternInput {
    /// Owning locale.
    pub locale_id: LocaleId,
    /// Free-text grouping category.
    pub category: String,
    /// Pattern type, unique within `(locale, category)`.
    pub pattern_type: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Optional regex source.
    pub regex_source: Option<String>,
    /// Optional regex flags.
    pub regex_flags: Option<String>,
    /// Optional reference to a named external recognizer.
    pub recognizer_ref: Option<String>,
    /// Optional reference to a named validator.
    pub validator_ref: Option<String>,
    /// Classification applied to matches when no override exists.
    pub default_classification: Classification,
    /// Optional hints describing known false positives.
    pub false_positive_hints: Option<String>,
    /// Optional example values.
    pub example_values: Vec<String>,
}

/// Partial update applied to a pattern; omitted fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternPatch {
    /// New display name, if set.
    pub display_name: Option<String>,
    /// New regex source, if set.
    pub regex_source: Option<String>,
    /// New regex flags, if set.
    pub regex_flags: Option<String>,
    /// New recognizer reference, if set.
    pub recognizer_ref: Option<String>,
    /// New validator reference, if set.
    pub validator_ref: Option<String>,
    /// New default classification, if set.
    pub default_classification: Option<Classification>,
    /// New false-positive hints, if set.
    pub false_positive_hints: Option<String>,
    /// New example values, if set.
    pub example_values: Option<Vec<String>>,
    /// New active flag, if set.
    pub active: Option<bool>,
}

/// Filter applied to [`crate::interfaces::Registry::list_patterns`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFilter {
    /// Restrict to a single locale.
    pub locale_id: Option<LocaleId>,
    /// Restrict to a single category.
    pub category: Option<String>,
    /// Restrict by active flag.
    pub active: Option<bool>,
}

// ============================================================================
// SECTION: User Entry
// ============================================================================

/// A user-declared sensitive value.
///
/// # Invariants
/// - `label` is globally unique across the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// Surrogate identifier.
    pub id: EntryId,
    /// Globally unique label.
    pub label: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Canonical sensitive value.
    pub primary_value: String,
    /// Classification for this entry.
    pub classification: Classification,
    /// Free-text grouping category.
    pub category: String,
    /// Optional operator notes.
    pub notes: Option<String>,
    /// Whether the entry is active.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last update timestamp.
    pub updated_at: Timestamp,
}

/// Input for creating a user entry, optionally with initial variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntryInput {
    /// Globally unique label.
    pub label: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Canonical sensitive value.
    pub primary_value: String,
    /// Classification for this entry.
    pub classification: Classification,
    /// Free-text grouping category.
    pub category: String,
    /// Optional operator notes.
    pub notes: Option<String>,
    /// Initial alternate surface forms.
    pub variants: Vec<EntryVariantInput>,
}

/// Alternate surface form for an entry.
///
/// # Invariants
/// - `(entry_id, variant_text)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryVariant {
    /// Surrogate identifier.
    pub id: VariantId,
    /// Owning entry identifier.
    pub entry_id: EntryId,
    /// Variant text.
    pub variant_text: String,
    /// Variant type; defaults to `alias`.
    pub variant_type: String,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

/// Input for adding a variant to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryVariantInput {
    /// Variant text.
    pub variant_text: String,
    /// Variant type; defaults to `alias` when absent.
    pub variant_type: Option<String>,
}

// ============================================================================
// SECTION: Inventory
// ============================================================================

/// Polymorphic reference to a registry entity tracked by the inventory.
///
/// # Invariants
/// - `ref_id` refers to a [`Pattern`] when `kind` is `Pattern`, or a
///   [`UserEntry`] when `kind` is `UserEntry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ref_type", rename_all = "snake_case")]
pub enum InventoryRef {
    /// References a [`Pattern`] by id.
    Pattern {
        /// Pattern identifier.
        ref_id: u64,
    },
    /// References a [`UserEntry`] by id.
    UserEntry {
        /// Entry identifier.
        ref_id: u64,
    },
}

/// Storage medium where a registry item was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// A file on disk or in object storage.
    File,
    /// A live agent/chat session.
    Session,
    /// In-memory/ephemeral state.
    Memory,
    /// A retrieval or RAG context window.
    Context,
}

/// How closely the stored data matches the original sensitive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataForm {
    /// Stored exactly as captured.
    Verbatim,
    /// Stored in paraphrased or summarized form.
    Paraphrased,
    /// Derived from the original value (e.g. a hash or token).
    Derived,
    /// A reference/pointer to the value stored elsewhere.
    Reference,
}

/// Ledger row recording where a registry item has been seen.
///
/// # Invariants
/// - `(ref_type, ref_id, storage_location)` is unique; repeated detections at
///   the same location update the same row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// Surrogate identifier.
    pub id: InventoryId,
    /// Polymorphic reference to the detected registry item.
    pub reference: InventoryRef,
    /// Denormalized label of the referenced item, for display without a join.
    pub ref_label: String,
    /// Storage location (path or URI).
    pub storage_location: String,
    /// Storage medium.
    pub storage_type: StorageType,
    /// Fidelity of the stored data relative to the original value.
    pub data_form: DataForm,
    /// Name of the detector that produced this sighting.
    pub detector_name: String,
    /// Current classification for this sighting.
    pub current_classification: Classification,
    /// Timestamp of the first detection at this location.
    pub first_detected_at: Timestamp,
    /// Timestamp of the most recent confirmation at this location.
    pub last_verified_at: Timestamp,
    /// Whether the record is still active.
    pub active: bool,
    /// Timestamp the record was deactivated, if any.
    pub deactivated_at: Option<Timestamp>,
    /// Identity of the actor who deactivated the record, if any.
    pub deactivated_by: Option<String>,
}

/// Input for recording a detection (insert-or-refresh by unique key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionInput {
    /// Polymorphic reference to the detected registry item.
    pub reference: InventoryRef,
    /// Denormalized label of the referenced item.
    pub ref_label: String,
    /// Storage location (path or URI).
    pub storage_location: String,
    /// Storage medium.
    pub storage_type: StorageType,
    /// Fidelity of the stored data relative to the original value.
    pub data_form: DataForm,
    /// Name of the detector that produced this sighting.
    pub detector_name: String,
    /// Current classification for this sighting.
    pub current_classification: Classification,
}

/// Aggregate counts of active inventory per classification tier, used to
/// recommend a posture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureInput {
    /// Active inventory rows classified `NEVER_SHARE`.
    pub never_share_count: u64,
    /// Active inventory rows classified `ASK_FIRST`.
    pub ask_first_count: u64,
    /// Active inventory rows classified `INTERNAL_ONLY`.
    pub internal_only_count: u64,
    /// Active inventory rows classified `PUBLIC`.
    pub public_count: u64,
    /// Total active inventory rows across all tiers.
    pub total_active: u64,
}

/// Aggregate registry health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryHealth {
    /// Total number of patterns (active and inactive).
    pub pattern_count: u64,
    /// Total number of user entries (active and inactive).
    pub entry_count: u64,
    /// Number of active inventory rows.
    pub active_inventory_count: u64,
    /// Whether a trivial read against the store succeeded.
    pub ok: bool,
}
