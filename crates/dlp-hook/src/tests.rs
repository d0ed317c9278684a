// crates/dlp-hook/src/tests.rs
// ============================================================================
// Module: Gateway Hook Tests
// Description: End-to-end scenarios over the hook with hand-rolled fake collaborators.
// Purpose: Exercise the decision table, quarantine lifecycle, kill switch, and fail-closed path.
// Dependencies: dlp-core
// ============================================================================

//! ## Overview
//! Fakes stand in for the registry, scanner, agent, and decision log so these
//! tests exercise only [`crate::GatewayHook`]'s own wiring, not a real
//! regex compiler or database.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panics are acceptable."
)]

use std::sync::Arc;
use std::sync::Mutex;

use dlp_core::Action;
use dlp_core::AgentError;
use dlp_core::AgentOutcome;
use dlp_core::Classification;
use dlp_core::DecisionLog;
use dlp_core::DecisionLogFilter;
use dlp_core::DecisionLogRecord;
use dlp_core::DecisionLogStats;
use dlp_core::DecisionType;
use dlp_core::Destination;
use dlp_core::DetectionInput;
use dlp_core::EntryId;
use dlp_core::EntryVariant;
use dlp_core::EntryVariantInput;
use dlp_core::Flag;
use dlp_core::FlagAnalysis;
use dlp_core::FlagSource;
use dlp_core::InboundRequest;
use dlp_core::InventoryId;
use dlp_core::InventoryRecord;
use dlp_core::Locale;
use dlp_core::LocaleInput;
use dlp_core::LogError;
use dlp_core::OutboundRequest;
use dlp_core::Pattern;
use dlp_core::PatternFilter;
use dlp_core::PatternId;
use dlp_core::PatternInput;
use dlp_core::PatternPatch;
use dlp_core::Posture;
use dlp_core::PostureInput;
use dlp_core::Registry;
use dlp_core::RegistryError;
use dlp_core::RegistryHealth;
use dlp_core::RequestId;
use dlp_core::ScanError;
use dlp_core::ScanId;
use dlp_core::ScanResult;
use dlp_core::Scanner;
use dlp_core::SecurityAgent;
use dlp_core::Timestamp;
use dlp_core::UserEntry;
use dlp_core::UserEntryInput;
use dlp_core::Verdict;
use dlp_core::VariantId;

use crate::GatewayHook;

/// Registry stub; the hook only ever hands this back via `get_registry`.
struct FakeRegistry;

impl Registry for FakeRegistry {
    fn create_locale(&self, _input: LocaleInput) -> Result<Locale, RegistryError> {
        Err(RegistryError::StorageUnavailable("fake registry".to_string()))
    }

    fn create_pattern(&self, _input: PatternInput) -> Result<Pattern, RegistryError> {
        Err(RegistryError::StorageUnavailable("fake registry".to_string()))
    }

    fn update_pattern(&self, _id: PatternId, _patch: PatternPatch) -> Result<Pattern, RegistryError> {
        Err(RegistryError::StorageUnavailable("fake registry".to_string()))
    }

    fn list_patterns(&self, _filter: PatternFilter) -> Result<Vec<Pattern>, RegistryError> {
        Ok(Vec::new())
    }

    fn deactivate_pattern(&self, _id: PatternId) -> Result<(), RegistryError> {
        Err(RegistryError::StorageUnavailable("fake registry".to_string()))
    }

    fn create_entry(&self, _input: UserEntryInput) -> Result<UserEntry, RegistryError> {
        Err(RegistryError::StorageUnavailable("fake registry".to_string()))
    }

    fn add_variant(&self, _entry_id: EntryId, _input: EntryVariantInput) -> Result<EntryVariant, RegistryError> {
        Err(RegistryError::StorageUnavailable("fake registry".to_string()))
    }

    fn remove_variant(&self, _variant_id: VariantId) -> Result<(), RegistryError> {
        Err(RegistryError::StorageUnavailable("fake registry".to_string()))
    }

    fn list_active_entries(&self) -> Result<Vec<(UserEntry, Vec<EntryVariant>)>, RegistryError> {
        Ok(Vec::new())
    }

    fn list_active_patterns(&self) -> Result<Vec<Pattern>, RegistryError> {
        Ok(Vec::new())
    }

    fn record_detection(&self, _input: DetectionInput) -> Result<InventoryRecord, RegistryError> {
        Err(RegistryError::StorageUnavailable("fake registry".to_string()))
    }

    fn deactivate_inventory(&self, _id: InventoryId, _actor: &str) -> Result<(), RegistryError> {
        Err(RegistryError::StorageUnavailable("fake registry".to_string()))
    }

    fn clear_inventory_by_location(&self, _location: &str, _actor: &str) -> Result<u64, RegistryError> {
        Ok(0)
    }

    fn get_posture_input(&self) -> Result<PostureInput, RegistryError> {
        Ok(PostureInput::default())
    }

    fn get_health(&self) -> Result<RegistryHealth, RegistryError> {
        Ok(RegistryHealth { pattern_count: 0, entry_count: 0, active_inventory_count: 0, ok: true })
    }
}

/// Scanner stub keyed on trigger substrings in the scanned text, so each
/// test can steer the scan outcome without a real regex compiler.
struct FakeScanner;

impl FakeScanner {
    const ERROR_TRIGGER: &'static str = "TRIGGER_SCAN_ERROR";
    const NEVER_SHARE_TRIGGER: &'static str = "SSN 123-45-6789";
    const ASK_FIRST_TRIGGER: &'static str = "maybe confidential";
    const INTERNAL_ONLY_TRIGGER: &'static str = "internal roadmap";

    fn flag(classification: Classification, label: &str) -> Flag {
        Flag {
            start_index: 0,
            end_index: 1,
            label: label.to_string(),
            matched_text: "x".to_string(),
            context: "[x]".to_string(),
            classification,
            confidence: 0.9,
            source: FlagSource::Pattern,
        }
    }
}

impl Scanner for FakeScanner {
    fn scan(&self, text: &str, _locale: Option<&str>) -> ScanResult {
        let scan_id = ScanId::new("scan-fake");
        let now = Timestamp::now();
        if text.contains(Self::ERROR_TRIGGER) {
            return ScanResult::error(scan_id, now, text.len(), 1, "simulated scan failure");
        }
        if text.contains(Self::NEVER_SHARE_TRIGGER) {
            return ScanResult::flagged(
                scan_id,
                now,
                text.len(),
                1,
                vec![Self::flag(Classification::NeverShare, "ssn")],
            );
        }
        if text.contains(Self::ASK_FIRST_TRIGGER) {
            return ScanResult::flagged(
                scan_id,
                now,
                text.len(),
                1,
                vec![Self::flag(Classification::AskFirst, "ask-first-entry")],
            );
        }
        if text.contains(Self::INTERNAL_ONLY_TRIGGER) {
            return ScanResult::flagged(
                scan_id,
                now,
                text.len(),
                1,
                vec![Self::flag(Classification::InternalOnly, "roadmap")],
            );
        }
        ScanResult::clean(scan_id, now, text.len(), 1)
    }

    fn reload(&self) -> Result<(), ScanError> {
        Ok(())
    }

    fn compile_failures(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Agent stub that passes scanner classifications through unchanged, unless
/// the content carries the downgrade trigger.
struct FakeAgent;

impl FakeAgent {
    const DOWNGRADE_TRIGGER: &'static str = "CACHED_BENIGN_CONTEXT";
}

impl SecurityAgent for FakeAgent {
    fn analyze(&self, content: &str, scan_result: &ScanResult) -> AgentOutcome {
        if scan_result.flags.is_empty() {
            return AgentOutcome::no_flags();
        }
        let downgrade = content.contains(Self::DOWNGRADE_TRIGGER);
        let analyses = scan_result
            .flags
            .iter()
            .enumerate()
            .map(|(flag_index, flag)| FlagAnalysis {
                flag_index,
                classification: if downgrade { Classification::AskFirst } else { flag.classification },
                confidence: flag.confidence,
                reasoning: "fake agent passthrough".to_string(),
                cached: downgrade,
            })
            .collect();
        AgentOutcome { analyses, overall: Classification::Public, agent_used: true }.with_recomputed_overall()
    }

    fn test_connection(&self) -> Result<u64, AgentError> {
        Ok(1)
    }
}

/// In-memory decision log that records everything it is handed, for
/// assertions on what the hook chose to log.
#[derive(Default)]
struct FakeDecisionLog {
    records: Mutex<Vec<DecisionLogRecord>>,
}

impl FakeDecisionLog {
    fn recorded_types(&self) -> Vec<DecisionType> {
        let guard = self.records.lock().expect("lock poisoned");
        guard.iter().map(|record| record.decision_type).collect()
    }
}

impl DecisionLog for FakeDecisionLog {
    fn record(&self, record: DecisionLogRecord) -> Result<(), LogError> {
        self.records.lock().expect("lock poisoned").push(record);
        Ok(())
    }

    fn flush(&self) -> Result<(), LogError> {
        Ok(())
    }

    fn close(&self) -> Result<(), LogError> {
        Ok(())
    }

    fn query(&self, _filter: DecisionLogFilter) -> Result<Vec<DecisionLogRecord>, LogError> {
        Ok(self.records.lock().expect("lock poisoned").clone())
    }

    fn stats(&self, _filter: DecisionLogFilter) -> Result<DecisionLogStats, LogError> {
        Ok(DecisionLogStats::default())
    }

    fn export_to_file(&self, _path: &std::path::Path, _filter: DecisionLogFilter) -> Result<u64, LogError> {
        Ok(0)
    }

    fn purge_old_entries(&self, _retention_days: u32) -> Result<u64, LogError> {
        Ok(0)
    }
}

fn build_hook() -> (GatewayHook, Arc<FakeDecisionLog>) {
    let log = Arc::new(FakeDecisionLog::default());
    let hook = GatewayHook::builder()
        .registry(Arc::new(FakeRegistry))
        .scanner(Arc::new(FakeScanner))
        .agent(Arc::new(FakeAgent))
        .decision_log(log.clone())
        .build()
        .expect("all collaborators supplied");
    (hook, log)
}

fn outbound(content: &str, destination: Destination) -> OutboundRequest {
    OutboundRequest { request_id: RequestId::new("req-1"), content: content.to_string(), destination, target: None }
}

#[test]
fn clean_content_always_allows() {
    let (hook, log) = build_hook();
    let result = hook.scan_outbound(outbound("nothing sensitive here", Destination::Email));
    assert_eq!(result.action, Action::Allow);
    assert!(result.approval_token.is_some());
    assert_eq!(log.recorded_types(), vec![DecisionType::OutboundScan]);
}

#[test]
fn never_share_quarantines_under_default_posture() {
    let (hook, log) = build_hook();
    let result = hook.scan_outbound(outbound("SSN 123-45-6789", Destination::Email));
    assert_eq!(result.action, Action::Quarantine);
    assert!(result.quarantine_id.is_some());
    assert_eq!(log.recorded_types(), vec![DecisionType::OutboundScan, DecisionType::QuarantineCreated]);
}

#[test]
fn ask_first_allows_under_permissive_posture() {
    let (hook, _log) = build_hook();
    hook.set_posture(Posture::Permissive, "tester");
    let result = hook.scan_outbound(outbound("maybe confidential", Destination::Chat));
    assert_eq!(result.action, Action::Allow);
}

#[test]
fn internal_only_allows_to_clipboard_but_quarantines_to_email() {
    let (hook, _log) = build_hook();
    let to_clipboard = hook.scan_outbound(outbound("internal roadmap", Destination::Clipboard));
    assert_eq!(to_clipboard.action, Action::Allow);
    let to_email = hook.scan_outbound(outbound("internal roadmap", Destination::Email));
    assert_eq!(to_email.action, Action::Quarantine);
}

#[test]
fn lockdown_blocks_public_content() {
    let (hook, _log) = build_hook();
    hook.set_posture(Posture::Lockdown, "tester");
    let result = hook.scan_outbound(outbound("totally public text", Destination::Email));
    assert_eq!(result.action, Action::Block);
    assert!(result.approval_token.is_none());
    assert!(result.quarantine_id.is_none());
}

#[test]
fn kill_switch_forces_block_regardless_of_content() {
    let (hook, log) = build_hook();
    hook.engage_kill_switch("tester");
    assert!(hook.kill_switch_engaged());
    let result = hook.scan_outbound(outbound("nothing sensitive here", Destination::Email));
    assert_eq!(result.action, Action::Block);
    assert!(log.recorded_types().contains(&DecisionType::KillSwitchOn));
    hook.disengage_kill_switch("tester");
    assert!(!hook.kill_switch_engaged());
    let after = hook.scan_outbound(outbound("nothing sensitive here", Destination::Email));
    assert_eq!(after.action, Action::Allow);
}

#[test]
fn quarantine_approval_is_terminal_and_mints_a_token() {
    let (hook, log) = build_hook();
    let result = hook.scan_outbound(outbound("SSN 123-45-6789", Destination::Email));
    let id = result.quarantine_id.expect("never-share quarantines");
    let first = hook.approve_quarantine(&id, "admin");
    assert!(first.is_some());
    let second = hook.approve_quarantine(&id, "admin");
    assert!(second.is_none());
    let entry = hook.get_quarantine(&id).expect("entry exists");
    assert_eq!(entry.resolved_by.as_deref(), Some("admin"));
    assert!(log.recorded_types().contains(&DecisionType::QuarantineApproved));
}

#[test]
fn quarantine_rejection_is_terminal() {
    let (hook, _log) = build_hook();
    let result = hook.scan_outbound(outbound("SSN 123-45-6789", Destination::Email));
    let id = result.quarantine_id.expect("never-share quarantines");
    assert!(hook.reject_quarantine(&id, "reviewer"));
    assert!(!hook.reject_quarantine(&id, "reviewer"));
    assert!(hook.approve_quarantine(&id, "admin").is_none());
}

#[test]
fn scan_failure_fails_closed_into_an_err_prefixed_quarantine() {
    let (hook, log) = build_hook();
    let result = hook.scan_outbound(outbound("TRIGGER_SCAN_ERROR", Destination::Email));
    assert_eq!(result.action, Action::Quarantine);
    assert_eq!(result.verdict, Verdict::Error);
    let id = result.quarantine_id.expect("fail-closed always quarantines");
    assert!(id.as_str().starts_with("err-"));
    assert!(result.approval_token.is_none());
    assert!(log.recorded_types().contains(&DecisionType::QuarantineCreated));
}

#[test]
fn agent_downgrade_relaxes_the_outbound_decision() {
    let (hook, _log) = build_hook();
    let plain = hook.scan_outbound(outbound("SSN 123-45-6789", Destination::Email));
    assert_eq!(plain.action, Action::Quarantine);
    let downgraded = hook.scan_outbound(outbound("SSN 123-45-6789 CACHED_BENIGN_CONTEXT", Destination::Email));
    assert_eq!(downgraded.action, Action::Quarantine);
    assert_eq!(downgraded.highest_classification, Some(Classification::AskFirst));
}

#[test]
fn inbound_inspection_never_blocks_and_recommends_a_posture() {
    let (hook, log) = build_hook();
    let result = hook.inspect_inbound(InboundRequest { request_id: RequestId::new("in-1"), content: "SSN 123-45-6789".to_string() });
    assert!(result.detected);
    assert_eq!(result.recommended_posture, Some(Posture::Strict));
    assert_eq!(log.recorded_types(), vec![DecisionType::InboundInspect]);
}

#[test]
fn health_snapshot_reflects_pending_quarantines() {
    let (hook, _log) = build_hook();
    assert_eq!(hook.get_health().counters.pending_quarantines, 0);
    let result = hook.scan_outbound(outbound("SSN 123-45-6789", Destination::Email));
    assert_eq!(hook.get_health().counters.pending_quarantines, 1);
    let id = result.quarantine_id.expect("never-share quarantines");
    hook.approve_quarantine(&id, "admin");
    assert_eq!(hook.get_health().counters.pending_quarantines, 0);
}
