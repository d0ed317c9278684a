// crates/dlp-core/src/core/hook.rs
// ============================================================================
// Module: DLP Watchdog Gateway Hook Domain Types
// Description: Posture, destinations, decision outcomes, and quarantine records.
// Purpose: Define the Layer 3 decision vocabulary shared between the hook and its callers.
// Dependencies: crate::core::classification, crate::core::identifiers, crate::core::scan, crate::core::time, serde
// ============================================================================

//! ## Overview
//! The gateway hook turns a [`crate::core::scan::ScanResult`] (optionally
//! refined by [`crate::core::agent::AgentOutcome`]) into an
//! allow/quarantine/block [`Action`] under the current [`Posture`]. This
//! module defines only the data shapes; the decision table itself lives in
//! `dlp-hook`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::classification::Classification;
use crate::core::identifiers::QuarantineId;
use crate::core::identifiers::RequestId;
use crate::core::scan::Flag;
use crate::core::scan::Verdict;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Posture
// ============================================================================

/// Caller-controlled sensitivity dial, least to most restrictive.
///
/// # Invariants
/// - Declaration order is least to most restrictive and drives `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    /// Allow everything except `lockdown`-only blocks.
    Permissive,
    /// Default posture: quarantine ambiguous content.
    Standard,
    /// Quarantine more aggressively; block nothing additional beyond standard.
    Strict,
    /// Block everything but clean content.
    Lockdown,
}

impl Default for Posture {
    fn default() -> Self {
        Self::Standard
    }
}

/// Orchestrator-level system mode, mapped to a [`Posture`] per the kill
/// switch / system mode design note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemMode {
    /// Normal operation.
    Normal,
    /// Heightened sensitivity.
    Elevated,
    /// Maximum restriction.
    Lockdown,
    /// Operator maintenance window.
    Maintenance,
}

impl From<SystemMode> for Posture {
    fn from(mode: SystemMode) -> Self {
        match mode {
            SystemMode::Normal => Self::Standard,
            SystemMode::Elevated => Self::Strict,
            SystemMode::Lockdown => Self::Lockdown,
            SystemMode::Maintenance => Self::Permissive,
        }
    }
}

// ============================================================================
// SECTION: Destination
// ============================================================================

/// Where outbound content is headed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Outbound email.
    Email,
    /// Chat/messaging surface.
    Chat,
    /// Programmatic API call.
    Api,
    /// Write to a file.
    File,
    /// Copy to the system clipboard.
    Clipboard,
    /// Render in a browser.
    Browser,
    /// Destination could not be classified.
    Unknown,
}

impl Destination {
    /// Returns true for destinations considered "internal" for the
    /// `INTERNAL_ONLY` tier (file, clipboard).
    #[must_use]
    pub const fn is_internal(self) -> bool {
        matches!(self, Self::File | Self::Clipboard)
    }
}

// ============================================================================
// SECTION: Action
// ============================================================================

/// Outbound decision action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Content may proceed; an approval token is minted.
    Allow,
    /// Content is held pending operator review.
    Quarantine,
    /// Content is rejected outright.
    Block,
}

// ============================================================================
// SECTION: Outbound
// ============================================================================

/// Request to scan and gate outbound content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// Caller-supplied request identifier.
    pub request_id: RequestId,
    /// Content to scan. Never persisted by the hook or logger.
    pub content: String,
    /// Destination the content is headed to.
    pub destination: Destination,
    /// Free-text target detail (e.g. recipient address), if known.
    pub target: Option<String>,
}

/// Outcome of a `dlp_hook::GatewayHook::scan_outbound` style call.
///
/// # Invariants
/// - `action == Allow` implies `approval_token.is_some()`.
/// - `action == Quarantine` implies `quarantine_id.is_some()`.
/// - `action == Block` implies both are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundResult {
    /// Echoes the request identifier.
    pub request_id: RequestId,
    /// Decision action.
    pub action: Action,
    /// Underlying scan verdict.
    pub verdict: Verdict,
    /// Flags produced by the scan (for telemetry; never logged verbatim).
    pub flags: Vec<Flag>,
    /// Strictest classification observed, if any flags were produced.
    pub highest_classification: Option<Classification>,
    /// Approval token minted for `Allow` results.
    pub approval_token: Option<String>,
    /// Quarantine identifier for `Quarantine` results (including fail-closed
    /// synthetic entries prefixed `err-`).
    pub quarantine_id: Option<QuarantineId>,
    /// Error message, set when the scan or hook failed closed.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Inbound
// ============================================================================

/// Request to passively inspect inbound content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundRequest {
    /// Caller-supplied request identifier.
    pub request_id: RequestId,
    /// Content to scan. Never persisted by the hook or logger.
    pub content: String,
}

/// Outcome of inbound inspection: never blocks, only informs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundResult {
    /// Echoes the request identifier.
    pub request_id: RequestId,
    /// Whether the scan produced any flags.
    pub detected: bool,
    /// Flags produced by the scan (for telemetry).
    pub flags: Vec<Flag>,
    /// Strictest classification observed, if any flags were produced.
    pub highest_classification: Option<Classification>,
    /// Posture recommendation derived from the highest classification.
    pub recommended_posture: Option<Posture>,
}

/// Derives a posture recommendation purely from the highest classification
/// observed during inbound inspection.
#[must_use]
pub fn recommend_posture(highest: Option<Classification>) -> Option<Posture> {
    match highest {
        Some(Classification::NeverShare) => Some(Posture::Strict),
        Some(Classification::AskFirst) => Some(Posture::Standard),
        _ => None,
    }
}

// ============================================================================
// SECTION: Quarantine
// ============================================================================

/// Lifecycle status of a [`QuarantineEntry`].
///
/// # Invariants
/// - Once a status leaves `Pending` it is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineStatus {
    /// Awaiting operator decision.
    Pending,
    /// Approved by an operator; a fresh approval token was minted.
    Approved,
    /// Rejected by an operator.
    Rejected,
    /// Swept to expired by a sweeper policy.
    Expired,
}

/// A held outbound request awaiting explicit approval or rejection.
///
/// # Invariants
/// - The original content is never stored; only `content_hash` (a keyed HMAC)
///   and `content_length`.
/// - Once `status` leaves `Pending` it is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    /// Quarantine identifier, formatted `quar-<8hex>` (or `err-<8hex>`).
    pub id: QuarantineId,
    /// Originating request identifier.
    pub request_id: RequestId,
    /// Keyed HMAC-SHA256 of the content, hex-encoded.
    pub content_hash: String,
    /// Length, in bytes, of the original content.
    pub content_length: usize,
    /// Destination the content was headed to.
    pub destination: Destination,
    /// Free-text target detail, if known.
    pub target: Option<String>,
    /// Flags captured at quarantine time.
    pub flags: Vec<Flag>,
    /// Strictest classification observed.
    pub highest_classification: Option<Classification>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Current lifecycle status.
    pub status: QuarantineStatus,
    /// Timestamp the entry was resolved (approved/rejected/expired).
    pub resolved_at: Option<Timestamp>,
    /// Identity of the operator who resolved the entry.
    pub resolved_by: Option<String>,
}

// ============================================================================
// SECTION: Health
// ============================================================================

/// Monotonic, eventually-consistent hook counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookCounters {
    /// Total outbound scans performed.
    pub scans: u64,
    /// Total outbound requests blocked.
    pub blocks: u64,
    /// Total outbound requests quarantined.
    pub quarantines: u64,
    /// Quarantine entries currently pending.
    pub pending_quarantines: u64,
    /// Total errors absorbed fail-closed.
    pub errors: u64,
}

/// Snapshot of hook health and configuration for external monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Whether the hook completed initialization.
    pub initialized: bool,
    /// Whether outbound scanning is enabled.
    pub outbound_enabled: bool,
    /// Whether inbound inspection is enabled.
    pub inbound_enabled: bool,
    /// Whether the kill switch is currently engaged.
    pub kill_switch_engaged: bool,
    /// Current posture.
    pub posture: Posture,
    /// Operation counters.
    pub counters: HookCounters,
    /// Milliseconds since the hook was constructed.
    pub uptime_ms: u64,
}
