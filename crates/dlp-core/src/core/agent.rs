// crates/dlp-core/src/core/agent.rs
// ============================================================================
// Module: DLP Watchdog Security Agent Domain Types
// Description: Per-flag LM re-classification output and the agent's overall outcome.
// Purpose: Carry Layer 2 contextual analysis from the security agent into the hook.
// Dependencies: crate::core::classification, crate::core::scan, serde
// ============================================================================

//! ## Overview
//! The security agent re-classifies each [`crate::core::scan::Flag`] produced
//! by the scanner. [`AgentOutcome`] is the sole output handed to the gateway
//! hook; it never carries the matched text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::classification::Classification;

// ============================================================================
// SECTION: Flag Analysis
// ============================================================================

/// Per-flag re-classification produced by the security agent.
///
/// # Invariants
/// - `confidence` is clamped to `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagAnalysis {
    /// Index of the flag within the originating [`crate::core::scan::ScanResult::flags`].
    pub flag_index: usize,
    /// Classification assigned by the agent (or carried over from the scanner).
    pub classification: Classification,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Free-text reasoning returned by the model, or a fixed fallback string.
    pub reasoning: String,
    /// Whether this analysis was served from the TTL cache.
    pub cached: bool,
}

// ============================================================================
// SECTION: Agent Outcome
// ============================================================================

/// Aggregate result of running the security agent over a scan result.
///
/// # Invariants
/// - `analyses.len()` equals the number of flags passed in, except in
///   disabled/no-flag passthrough cases where it mirrors the input exactly.
/// - `overall` is the strictest classification across `analyses`, or
///   [`Classification::Public`] when `analyses` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    /// Per-flag analyses, aligned by index with the originating flags.
    pub analyses: Vec<FlagAnalysis>,
    /// Strictest classification across all analyses.
    pub overall: Classification,
    /// Whether any language-model call was attempted for this outcome.
    pub agent_used: bool,
}

impl AgentOutcome {
    /// Builds the outcome for the no-flag case: empty analyses, `PUBLIC`
    /// overall, agent not used.
    #[must_use]
    pub fn no_flags() -> Self {
        Self {
            analyses: Vec::new(),
            overall: Classification::Public,
            agent_used: false,
        }
    }

    /// Recomputes `overall` from `analyses` and returns the updated outcome.
    #[must_use]
    pub fn with_recomputed_overall(mut self) -> Self {
        self.overall = Classification::overall_of(self.analyses.iter().map(|a| a.classification));
        self
    }
}
