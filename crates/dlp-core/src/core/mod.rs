// crates/dlp-core/src/core/mod.rs
// ============================================================================
// Module: DLP Watchdog Core Domain
// Description: Aggregates and re-exports the domain types shared by every layer.
// Purpose: Give downstream crates a single flat import surface (`dlp_core::...`).
// Dependencies: none (re-export hub)
// ============================================================================

//! ## Overview
//! Flat re-export hub over the domain submodules. Downstream crates import
//! types as `dlp_core::Classification`, `dlp_core::Pattern`, and so on, rather
//! than reaching into `dlp_core::core::registry::Pattern` directly.

pub mod agent;
pub mod classification;
pub mod decision_log;
pub mod hook;
pub mod identifiers;
pub mod registry;
pub mod scan;
pub mod time;

pub use agent::AgentOutcome;
pub use agent::FlagAnalysis;
pub use classification::Classification;
pub use decision_log::DecisionLogFilter;
pub use decision_log::DecisionLogRecord;
pub use decision_log::DecisionLogStats;
pub use decision_log::DecisionType;
pub use decision_log::OrderByField;
pub use decision_log::SortDirection;
pub use hook::Action;
pub use hook::Destination;
pub use hook::HealthStatus;
pub use hook::HookCounters;
pub use hook::InboundRequest;
pub use hook::InboundResult;
pub use hook::OutboundRequest;
pub use hook::OutboundResult;
pub use hook::Posture;
pub use hook::QuarantineEntry;
pub use hook::QuarantineStatus;
pub use hook::SystemMode;
pub use hook::recommend_posture;
pub use identifiers::DecisionLogId;
pub use identifiers::EntryId;
pub use identifiers::InventoryId;
pub use identifiers::LocaleId;
pub use identifiers::PatternId;
pub use identifiers::QuarantineId;
pub use identifiers::RequestId;
pub use identifiers::ScanId;
pub use identifiers::SessionKey;
pub use identifiers::VariantId;
pub use registry::DataForm;
pub use registry::DetectionInput;
pub use registry::EntryVariant;
pub use registry::EntryVariantInput;
pub use registry::InventoryRecord;
pub use registry::InventoryRef;
pub use registry::Locale;
pub use registry::LocaleInput;
pub use registry::Pattern;
pub use registry::PatternFilter;
pub use registry::PatternInput;
pub use registry::PatternPatch;
pub use registry::PostureInput;
pub use registry::RegistryHealth;
pub use registry::StorageType;
pub use registry::UserEntry;
pub use registry::UserEntryInput;
pub use scan::Flag;
pub use scan::FlagSource;
pub use scan::SanitizedFlag;
pub use scan::ScanResult;
pub use scan::Verdict;
pub use time::Timestamp;
