// crates/dlp-hook/src/decision.rs
// ============================================================================
// Module: Outbound Decision Table
// Description: Maps (highest classification, destination, posture) to an action.
// Purpose: Implement the posture-driven allow/quarantine/block decision.
// Dependencies: dlp-core
// ============================================================================

//! ## Overview
//! No flags always allows. Otherwise the decision depends on the flagged
//! classification's strictness, whether the destination counts as
//! "internal" (file, clipboard), and the current posture.

use dlp_core::Action;
use dlp_core::Classification;
use dlp_core::Destination;
use dlp_core::Posture;

/// Applies the outbound decision table to a scan's highest classification.
#[must_use]
pub(crate) fn decide(highest: Option<Classification>, destination: Destination, posture: Posture) -> Action {
    let Some(classification) = highest else { return Action::Allow };
    match classification {
        Classification::Public => allow_unless_lockdown(posture),
        Classification::InternalOnly if destination.is_internal() => allow_unless_lockdown(posture),
        Classification::InternalOnly | Classification::AskFirst => match posture {
            Posture::Permissive => Action::Allow,
            Posture::Standard | Posture::Strict => Action::Quarantine,
            Posture::Lockdown => Action::Block,
        },
        Classification::NeverShare => match posture {
            Posture::Permissive | Posture::Standard => Action::Quarantine,
            Posture::Strict | Posture::Lockdown => Action::Block,
        },
    }
}

/// Blocks under lockdown, allows under every other posture.
fn allow_unless_lockdown(posture: Posture) -> Action {
    if posture == Posture::Lockdown { Action::Block } else { Action::Allow }
}

#[cfg(test)]
mod tests {
    use super::decide;
    use dlp_core::Action;
    use dlp_core::Classification;
    use dlp_core::Destination;
    use dlp_core::Posture;

    #[test]
    fn no_flags_always_allows() {
        for posture in [Posture::Permissive, Posture::Standard, Posture::Strict, Posture::Lockdown] {
            assert_eq!(decide(None, Destination::Email, posture), Action::Allow);
        }
    }

    #[test]
    fn public_blocks_only_under_lockdown() {
        assert_eq!(decide(Some(Classification::Public), Destination::Email, Posture::Strict), Action::Allow);
        assert_eq!(decide(Some(Classification::Public), Destination::Email, Posture::Lockdown), Action::Block);
    }

    #[test]
    fn internal_only_to_internal_destination_allows_outside_lockdown() {
        assert_eq!(decide(Some(Classification::InternalOnly), Destination::Clipboard, Posture::Strict), Action::Allow);
        assert_eq!(decide(Some(Classification::InternalOnly), Destination::Clipboard, Posture::Lockdown), Action::Block);
    }

    #[test]
    fn internal_only_to_external_destination_quarantines_under_standard_and_strict() {
        assert_eq!(decide(Some(Classification::InternalOnly), Destination::Email, Posture::Permissive), Action::Allow);
        assert_eq!(decide(Some(Classification::InternalOnly), Destination::Email, Posture::Standard), Action::Quarantine);
        assert_eq!(decide(Some(Classification::InternalOnly), Destination::Email, Posture::Strict), Action::Quarantine);
        assert_eq!(decide(Some(Classification::InternalOnly), Destination::Email, Posture::Lockdown), Action::Block);
    }

    #[test]
    fn ask_first_matches_internal_only_external_row() {
        assert_eq!(decide(Some(Classification::AskFirst), Destination::Chat, Posture::Permissive), Action::Allow);
        assert_eq!(decide(Some(Classification::AskFirst), Destination::Chat, Posture::Standard), Action::Quarantine);
        assert_eq!(decide(Some(Classification::AskFirst), Destination::Chat, Posture::Lockdown), Action::Block);
    }

    #[test]
    fn never_share_quarantines_under_permissive_and_standard_blocks_otherwise() {
        assert_eq!(decide(Some(Classification::NeverShare), Destination::Email, Posture::Permissive), Action::Quarantine);
        assert_eq!(decide(Some(Classification::NeverShare), Destination::Email, Posture::Standard), Action::Quarantine);
        assert_eq!(decide(Some(Classification::NeverShare), Destination::Email, Posture::Strict), Action::Block);
        assert_eq!(decide(Some(Classification::NeverShare), Destination::Email, Posture::Lockdown), Action::Block);
    }
}
