// crates/dlp-core/src/core/classification.rs
// ============================================================================
// Module: DLP Watchdog Classification
// Description: Totally ordered sensitivity tiers shared by scanner, agent, and hook.
// Purpose: Rank flags and compute the strictest tier over a set.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Classification is the single sensitivity scale shared by every layer of the
//! pipeline. Ordering is derived from declaration order, strictest first, so
//! that `Ord`/`PartialOrd` comparisons and `min`/`max` directly express "more
//! restrictive than".
//!
//! Security posture: classification values drive allow/quarantine/block
//! decisions; never loosen a classification inferred from untrusted content.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Sensitivity tier assigned to a pattern, entry, flag, or inventory record.
///
/// # Invariants
/// - Variants are declared strictest first, so the derived `Ord` ranks
///   `NeverShare` lowest and `Public` highest; `Ord::min` over a set yields
///   the strictest tier present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// Must never be shared outside the originating context.
    NeverShare,
    /// Requires explicit operator approval before release.
    AskFirst,
    /// Safe for internal destinations only (file, clipboard).
    InternalOnly,
    /// Safe for any destination.
    Public,
}

impl Classification {
    /// Returns the strictest (minimum-rank) classification across a set.
    ///
    /// Returns [`Classification::Public`] for an empty set, matching the
    /// "no flags" / "no analyses" baseline used by the scanner and agent.
    #[must_use]
    pub fn overall_of<I: IntoIterator<Item = Self>>(values: I) -> Self {
        values.into_iter().min().unwrap_or(Self::Public)
    }

    /// Returns the stable lowercase wire label for the classification.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NeverShare => "NEVER_SHARE",
            Self::AskFirst => "ASK_FIRST",
            Self::InternalOnly => "INTERNAL_ONLY",
            Self::Public => "PUBLIC",
        }
    }

    /// Parses a classification from its wire label, normalizing case and
    /// stripping non-letter characters before matching.
    ///
    /// Unknown labels return `None`; callers in the agent pipeline map `None`
    /// to [`Classification::AskFirst`] per the normalization policy.
    #[must_use]
    pub fn parse_normalized(raw: &str) -> Option<Self> {
        let cleaned: String =
            raw.chars().filter(char::is_ascii_alphabetic).collect::<String>().to_ascii_uppercase();
        match cleaned.as_str() {
            "NEVERSHARE" => Some(Self::NeverShare),
            "ASKFIRST" => Some(Self::AskFirst),
            "INTERNALONLY" => Some(Self::InternalOnly),
            "PUBLIC" => Some(Self::Public),
            _ => None,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Classification;

    #[test]
    fn singleton_overall_is_identity() {
        for c in [
            Classification::NeverShare,
            Classification::AskFirst,
            Classification::InternalOnly,
            Classification::Public,
        ] {
            assert_eq!(Classification::overall_of([c]), c);
        }
    }

    #[test]
    fn overall_picks_strictest() {
        let set = [Classification::Public, Classification::NeverShare, Classification::AskFirst];
        assert_eq!(Classification::overall_of(set), Classification::NeverShare);
    }

    #[test]
    fn empty_overall_is_public() {
        assert_eq!(Classification::overall_of([]), Classification::Public);
    }

    #[test]
    fn ordering_is_strictest_first() {
        assert!(Classification::NeverShare < Classification::AskFirst);
        assert!(Classification::AskFirst < Classification::InternalOnly);
        assert!(Classification::InternalOnly < Classification::Public);
    }

    #[test]
    fn parse_normalized_strips_noise() {
        assert_eq!(Classification::parse_normalized("never_share"), Some(Classification::NeverShare));
        assert_eq!(Classification::parse_normalized(" Ask-First! "), Some(Classification::AskFirst));
        assert_eq!(Classification::parse_normalized("internal only"), Some(Classification::InternalOnly));
        assert_eq!(Classification::parse_normalized("nonsense"), None);
    }
}
