// crates/dlp-core/src/lib.rs
// ============================================================================
// Module: DLP Watchdog Core Library
// Description: Shared domain types and backend-agnostic interfaces for the DLP pipeline.
// Purpose: Define the vocabulary implemented by dlp-store-sqlite, dlp-scanner, dlp-agent, dlp-hook.
// Dependencies: serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! `dlp-core` defines the data model and trait surfaces shared by every layer
//! of the DLP watchdog: the registry (patterns, entries, inventory), the
//! pattern scanner, the security agent, the gateway hook, and the decision
//! logger. It has no storage, regex-engine, or HTTP-client dependencies of
//! its own — those live in `dlp-store-sqlite`, `dlp-scanner`, and `dlp-agent`
//! respectively, all implemented against the traits defined here.
//!
//! Security posture: types in this crate describe content flowing through an
//! untrusted interception point; classifications must never be silently
//! loosened on the way from scanner to hook to logger.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::AgentOutcome;
pub use core::Classification;
pub use core::DataForm;
pub use core::DecisionLogFilter;
pub use core::DecisionLogRecord;
pub use core::DecisionLogStats;
pub use core::DecisionLogId;
pub use core::DecisionType;
pub use core::Destination;
pub use core::DetectionInput;
pub use core::EntryId;
pub use core::EntryVariant;
pub use core::EntryVariantInput;
pub use core::Flag;
pub use core::FlagAnalysis;
pub use core::FlagSource;
pub use core::HealthStatus;
pub use core::HookCounters;
pub use core::InboundRequest;
pub use core::InboundResult;
pub use core::InventoryId;
pub use core::InventoryRecord;
pub use core::InventoryRef;
pub use core::Locale;
pub use core::LocaleId;
pub use core::LocaleInput;
pub use core::Action;
pub use core::OrderByField;
pub use core::OutboundRequest;
pub use core::OutboundResult;
pub use core::Pattern;
pub use core::PatternFilter;
pub use core::PatternId;
pub use core::PatternInput;
pub use core::PatternPatch;
pub use core::Posture;
pub use core::PostureInput;
pub use core::QuarantineEntry;
pub use core::QuarantineId;
pub use core::QuarantineStatus;
pub use core::RegistryHealth;
pub use core::RequestId;
pub use core::SanitizedFlag;
pub use core::ScanId;
pub use core::ScanResult;
pub use core::SessionKey;
pub use core::SortDirection;
pub use core::StorageType;
pub use core::SystemMode;
pub use core::Timestamp;
pub use core::UserEntry;
pub use core::UserEntryInput;
pub use core::VariantId;
pub use core::Verdict;
pub use core::recommend_posture;

pub use interfaces::AgentError;
pub use interfaces::DecisionLog;
pub use interfaces::LogError;
pub use interfaces::Registry;
pub use interfaces::RegistryError;
pub use interfaces::ScanError;
pub use interfaces::Scanner;
pub use interfaces::SecurityAgent;
pub use interfaces::clamp_confidence;
pub use interfaces::normalize_classification;
