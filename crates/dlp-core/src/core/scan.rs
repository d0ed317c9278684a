// crates/dlp-core/src/core/scan.rs
// ============================================================================
// Module: DLP Watchdog Scan Domain Types
// Description: Flags and scan results produced by the pattern scanner.
// Purpose: Carry deterministic detection output from Layer 1 into the agent and hook.
// Dependencies: crate::core::classification, crate::core::identifiers, crate::core::time, serde
// ============================================================================

//! ## Overview
//! A [`ScanResult`] is the sole output of the pattern scanner. It is
//! deliberately data-only: no compiled regex, no registry handles. Downstream
//! layers (agent, hook, logger) only ever see this shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::classification::Classification;
use crate::core::identifiers::ScanId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Flags
// ============================================================================

/// Origin of a single detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSource {
    /// Detected by a compiled registry pattern.
    Pattern,
    /// Detected by a substring match against a user entry or variant.
    Entry,
}

/// A single detection emitted by the scanner.
///
/// # Invariants
/// - `start_index <= end_index <= ` length of the scanned text.
/// - `confidence` is in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    /// Byte offset where the match starts.
    pub start_index: usize,
    /// Byte offset where the match ends (exclusive).
    pub end_index: usize,
    /// Pattern type or entry label identifying what matched.
    pub label: String,
    /// The matched text itself. Never persisted by the decision logger.
    pub matched_text: String,
    /// Context surrounding the match, bracketed as `[matched]`. Never
    /// persisted by the decision logger.
    pub context: String,
    /// Classification assigned to this flag.
    pub classification: Classification,
    /// Match confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Detection origin.
    pub source: FlagSource,
}

/// A [`Flag`] with `matched_text` and `context` stripped, safe for the
/// decision log and any other durable or outbound sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedFlag {
    /// Byte offset where the match starts.
    pub start_index: usize,
    /// Byte offset where the match ends (exclusive).
    pub end_index: usize,
    /// Pattern type or entry label identifying what matched.
    pub label: String,
    /// Classification assigned to this flag.
    pub classification: Classification,
    /// Match confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Detection origin.
    pub source: FlagSource,
}

impl From<&Flag> for SanitizedFlag {
    fn from(flag: &Flag) -> Self {
        Self {
            start_index: flag.start_index,
            end_index: flag.end_index,
            label: flag.label.clone(),
            classification: flag.classification,
            confidence: flag.confidence,
            source: flag.source,
        }
    }
}

// ============================================================================
// SECTION: Scan Result
// ============================================================================

/// Outcome of a single scan call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No flags were produced.
    Clean,
    /// One or more flags were produced.
    Flagged,
    /// The scan could not complete; no partial flags are included.
    Error,
}

/// Result of running the scanner over a piece of text.
///
/// # Invariants
/// - `flag_count == flags.len()`.
/// - `verdict == Flagged` iff `flag_count > 0`; `verdict == Error` implies
///   `flags` is empty.
/// - `highest_classification` is `None` only when `flags` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Identifier minted for this scan.
    pub scan_id: ScanId,
    /// Wall-clock time the scan was performed.
    pub scanned_at: Timestamp,
    /// Length, in bytes, of the scanned input.
    pub input_length: usize,
    /// Wall-clock duration of the scan, in milliseconds.
    pub duration_ms: u64,
    /// Flags produced by the scan, in detection order.
    pub flags: Vec<Flag>,
    /// Number of flags produced.
    pub flag_count: usize,
    /// Strictest classification across all flags, if any.
    pub highest_classification: Option<Classification>,
    /// Overall verdict for the scan.
    pub verdict: Verdict,
    /// Error message when `verdict == Error`.
    pub error: Option<String>,
}

impl ScanResult {
    /// Builds a clean result for empty input or a text with no detections.
    #[must_use]
    pub fn clean(scan_id: ScanId, scanned_at: Timestamp, input_length: usize, duration_ms: u64) -> Self {
        Self {
            scan_id,
            scanned_at,
            input_length,
            duration_ms,
            flags: Vec::new(),
            flag_count: 0,
            highest_classification: None,
            verdict: Verdict::Clean,
            error: None,
        }
    }

    /// Builds an error result carrying no flags.
    #[must_use]
    pub fn error(
        scan_id: ScanId,
        scanned_at: Timestamp,
        input_length: usize,
        duration_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            scan_id,
            scanned_at,
            input_length,
            duration_ms,
            flags: Vec::new(),
            flag_count: 0,
            highest_classification: None,
            verdict: Verdict::Error,
            error: Some(message.into()),
        }
    }

    /// Builds a flagged result from a non-empty flag set.
    ///
    /// # Panics
    ///
    /// Panics if `flags` is empty; use [`ScanResult::clean`] instead.
    #[must_use]
    pub fn flagged(
        scan_id: ScanId,
        scanned_at: Timestamp,
        input_length: usize,
        duration_ms: u64,
        flags: Vec<Flag>,
    ) -> Self {
        assert!(!flags.is_empty(), "flagged() requires at least one flag");
        let highest = Classification::overall_of(flags.iter().map(|f| f.classification));
        Self {
            scan_id,
            scanned_at,
            input_length,
            duration_ms,
            flag_count: flags.len(),
            flags,
            highest_classification: Some(highest),
            verdict: Verdict::Flagged,
            error: None,
        }
    }
}
