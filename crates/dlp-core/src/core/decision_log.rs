// crates/dlp-core/src/core/decision_log.rs
// ============================================================================
// Module: DLP Watchdog Decision Log Domain Types
// Description: Audit event taxonomy, persisted records, query filters, and aggregate stats.
// Purpose: Define the append-only audit trail vocabulary shared by hook callers and the logger.
// Dependencies: crate::core::classification, crate::core::hook, crate::core::identifiers, crate::core::scan, crate::core::time, serde, serde_json
// ============================================================================

//! ## Overview
//! Every decision-worthy event in the pipeline is recorded as a
//! [`DecisionLogRecord`]. Columns cover the union of all decision kinds and
//! are nullable where inapplicable. The sensitive-content rule is enforced at
//! construction time: records only ever carry [`crate::core::scan::SanitizedFlag`]
//! details, never raw [`crate::core::scan::Flag`] values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::classification::Classification;
use crate::core::hook::Action;
use crate::core::hook::Destination;
use crate::core::identifiers::DecisionLogId;
use crate::core::identifiers::QuarantineId;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::SessionKey;
use crate::core::scan::SanitizedFlag;
use crate::core::scan::Verdict;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Event Types
// ============================================================================

/// Kind of decision-worthy event recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    /// An outbound scan and decision.
    OutboundScan,
    /// A passive inbound inspection.
    InboundInspect,
    /// A quarantine entry was created.
    QuarantineCreated,
    /// A quarantine entry was approved.
    QuarantineApproved,
    /// A quarantine entry was rejected.
    QuarantineRejected,
    /// A quarantine entry expired via the sweeper.
    QuarantineExpired,
    /// The posture was changed.
    PostureChanged,
    /// The kill switch was engaged.
    KillSwitchOn,
    /// The kill switch was disengaged.
    KillSwitchOff,
    /// The registry was updated (create/update/deactivate).
    RegistryUpdated,
    /// The system started up.
    SystemStartup,
    /// The system shut down.
    SystemShutdown,
}

// ============================================================================
// SECTION: Record
// ============================================================================

/// Persisted, append-only audit record.
///
/// # Invariants
/// - `flag_details`, when present, never contains `matched_text` or `context`.
/// - `content_hash`/`content_length` may be present; raw content never is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogRecord {
    /// Surrogate identifier assigned by the store.
    pub id: Option<DecisionLogId>,
    /// Kind of event.
    pub decision_type: DecisionType,
    /// Wall-clock time the event occurred.
    pub timestamp: Timestamp,
    /// Associated request identifier, if applicable.
    pub request_id: Option<RequestId>,
    /// Associated session key, if applicable.
    pub session_key: Option<SessionKey>,
    /// Action taken, if this event carries a decision.
    pub action: Option<Action>,
    /// Scan verdict, if this event carries a scan.
    pub verdict: Option<Verdict>,
    /// Destination, if applicable.
    pub destination: Option<Destination>,
    /// Free-text target detail, if known.
    pub target: Option<String>,
    /// Content hash (never the content itself), if applicable.
    pub content_hash: Option<String>,
    /// Content length in bytes, if applicable.
    pub content_length: Option<usize>,
    /// Number of flags produced, if applicable.
    pub flag_count: Option<usize>,
    /// Strictest classification observed, if applicable.
    pub highest_classification: Option<Classification>,
    /// Duration of the underlying operation, in milliseconds.
    pub duration_ms: Option<u64>,
    /// Operator identity, for approve/reject/posture-change events.
    pub operator: Option<String>,
    /// Free-text reason, for posture-change/kill-switch events.
    pub reason: Option<String>,
    /// Previous state description, for state-transition events.
    pub previous_state: Option<String>,
    /// New state description, for state-transition events.
    pub new_state: Option<String>,
    /// Quarantine identifier, for quarantine lifecycle events.
    pub quarantine_id: Option<QuarantineId>,
    /// Sanitized flag details (never raw matched text or context).
    pub flag_details: Option<Vec<SanitizedFlag>>,
    /// Free-form metadata, opaque to the logger.
    pub metadata: Option<Value>,
}

impl DecisionLogRecord {
    /// Builds a minimal record for the given type and timestamp, with every
    /// other field `None`. Callers set the fields relevant to their event.
    #[must_use]
    pub fn new(decision_type: DecisionType, timestamp: Timestamp) -> Self {
        Self {
            id: None,
            decision_type,
            timestamp,
            request_id: None,
            session_key: None,
            action: None,
            verdict: None,
            destination: None,
            target: None,
            content_hash: None,
            content_length: None,
            flag_count: None,
            highest_classification: None,
            duration_ms: None,
            operator: None,
            reason: None,
            previous_state: None,
            new_state: None,
            quarantine_id: None,
            flag_details: None,
            metadata: None,
        }
    }
}

// ============================================================================
// SECTION: Query
// ============================================================================

/// Sort key for [`crate::interfaces::DecisionLog::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderByField {
    /// Order by event timestamp.
    Timestamp,
    /// Order by decision type.
    Type,
    /// Order by action.
    Action,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Filter for querying the decision log.
///
/// # Invariants
/// - `start_time`/`end_time`, when both set, satisfy `start_time <= end_time`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionLogFilter {
    /// Restrict to a single decision type.
    pub decision_type: Option<DecisionType>,
    /// Restrict to any of these decision types.
    pub decision_types: Option<Vec<DecisionType>>,
    /// Restrict to a single action.
    pub action: Option<Action>,
    /// Restrict to a single verdict.
    pub verdict: Option<Verdict>,
    /// Restrict to a single destination.
    pub destination: Option<Destination>,
    /// Restrict to a single classification.
    pub classification: Option<Classification>,
    /// Restrict to a single operator.
    pub operator: Option<String>,
    /// Restrict to events at or after this time.
    pub start_time: Option<Timestamp>,
    /// Restrict to events at or before this time.
    pub end_time: Option<Timestamp>,
    /// Restrict to a single session key.
    pub session_key: Option<SessionKey>,
    /// Restrict to a single request identifier.
    pub request_id: Option<RequestId>,
    /// Maximum rows to return.
    pub limit: Option<u64>,
    /// Rows to skip before returning results.
    pub offset: Option<u64>,
    /// Sort key.
    pub order_by: Option<OrderByField>,
    /// Sort direction; defaults to descending (most recent first).
    pub order_direction: Option<SortDirection>,
}

// ============================================================================
// SECTION: Stats
// ============================================================================

/// Aggregate statistics over a (possibly time-windowed) subset of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogStats {
    /// Total matching rows.
    pub total: u64,
    /// Counts grouped by decision type.
    pub by_type: Vec<(DecisionType, u64)>,
    /// Counts grouped by action.
    pub by_action: Vec<(Action, u64)>,
    /// Counts grouped by verdict.
    pub by_verdict: Vec<(Verdict, u64)>,
    /// Counts grouped by classification.
    pub by_classification: Vec<(Classification, u64)>,
    /// Average duration over rows with a non-null duration, in milliseconds.
    pub average_duration_ms: Option<f64>,
    /// Earliest timestamp among matching rows.
    pub min_timestamp: Option<Timestamp>,
    /// Latest timestamp among matching rows.
    pub max_timestamp: Option<Timestamp>,
}
