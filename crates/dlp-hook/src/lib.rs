// crates/dlp-hook/src/lib.rs
// ============================================================================
// Module: DLP Watchdog Gateway Hook
// Description: Layer 3 posture-driven decision engine composing the scanner, agent, and logger.
// Purpose: Turn a scan into allow/quarantine/block, mint approval tokens, hold a quarantine queue.
// Dependencies: dlp-core, hmac, sha2, hex, base64, rand, serde_jcs, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`GatewayHook`] is a concrete composition over [`dlp_core::Registry`],
//! [`dlp_core::Scanner`], [`dlp_core::SecurityAgent`], and
//! [`dlp_core::DecisionLog`] trait objects; it does not itself implement a
//! shared core trait. Every outbound decision resolves to `allow`,
//! `quarantine`, or `block` and is recorded; nothing here ever propagates a
//! scan or agent failure as an exception — failures fail closed into a
//! synthetic `err`-prefixed quarantine.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod decision;
mod quarantine;
mod token;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Instant;

use dlp_core::Action;
use dlp_core::Classification;
use dlp_core::DecisionLog;
use dlp_core::DecisionLogRecord;
use dlp_core::DecisionType;
use dlp_core::HealthStatus;
use dlp_core::HookCounters;
use dlp_core::InboundRequest;
use dlp_core::InboundResult;
use dlp_core::OutboundRequest;
use dlp_core::OutboundResult;
use dlp_core::Posture;
use dlp_core::QuarantineEntry;
use dlp_core::QuarantineId;
use dlp_core::QuarantineStatus;
use dlp_core::Registry;
use dlp_core::SanitizedFlag;
use dlp_core::ScanError;
use dlp_core::Scanner;
use dlp_core::SecurityAgent;
use dlp_core::Timestamp;
use dlp_core::Verdict;
use dlp_core::recommend_posture;
use quarantine::QuarantineStore;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::warn;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced while building or operating a [`GatewayHook`].
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HookError {
    /// No registry was supplied to the builder.
    #[error("gateway hook is missing a registry")]
    MissingRegistry,
    /// No scanner was supplied to the builder.
    #[error("gateway hook is missing a scanner")]
    MissingScanner,
    /// No security agent was supplied to the builder.
    #[error("gateway hook is missing a security agent")]
    MissingAgent,
    /// No decision log was supplied to the builder.
    #[error("gateway hook is missing a decision log")]
    MissingDecisionLog,
    /// Approval token signing failed.
    #[error("approval token signing failed: {0}")]
    Signing(String),
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Construction-time configuration for a [`GatewayHook`].
#[derive(Debug, Clone)]
pub struct GatewayHookConfig {
    /// HMAC key used to sign approval tokens and content hashes. When
    /// absent, a random key is generated at construction; tokens then do
    /// not survive a process restart.
    pub hmac_key: Option<Vec<u8>>,
    /// Whether `scan_outbound` performs real scanning (`false` allows
    /// everything unconditionally).
    pub outbound_enabled: bool,
    /// Whether `inspect_inbound` performs real scanning (`false` always
    /// reports a clean, undetected result).
    pub inbound_enabled: bool,
    /// Posture the hook starts in.
    pub initial_posture: Posture,
}

impl Default for GatewayHookConfig {
    fn default() -> Self {
        Self { hmac_key: None, outbound_enabled: true, inbound_enabled: true, initial_posture: Posture::default() }
    }
}

/// Generates a fresh random 32-byte HMAC key.
fn generate_hmac_key() -> Vec<u8> {
    let mut key = vec![0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Fluent builder for [`GatewayHook`].
///
/// # Invariants
/// - `build` succeeds only when a registry, scanner, agent, and decision log
///   are all configured.
#[derive(Default)]
pub struct GatewayHookBuilder {
    /// Registry handle exposed via `get_registry`.
    registry: Option<Arc<dyn Registry + Send + Sync>>,
    /// Layer 1 pattern scanner.
    scanner: Option<Arc<dyn Scanner + Send + Sync>>,
    /// Layer 2 security agent.
    agent: Option<Arc<dyn SecurityAgent + Send + Sync>>,
    /// Decision logger.
    decision_log: Option<Arc<dyn DecisionLog + Send + Sync>>,
    /// Hook configuration.
    config: GatewayHookConfig,
}

impl GatewayHookBuilder {
    /// Registers the registry handle.
    #[must_use]
    pub fn registry(mut self, registry: Arc<dyn Registry + Send + Sync>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Registers the pattern scanner.
    #[must_use]
    pub fn scanner(mut self, scanner: Arc<dyn Scanner + Send + Sync>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Registers the security agent.
    #[must_use]
    pub fn agent(mut self, agent: Arc<dyn SecurityAgent + Send + Sync>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Registers the decision logger.
    #[must_use]
    pub fn decision_log(mut self, decision_log: Arc<dyn DecisionLog + Send + Sync>) -> Self {
        self.decision_log = Some(decision_log);
        self
    }

    /// Overrides the default configuration.
    #[must_use]
    pub fn config(mut self, config: GatewayHookConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the gateway hook.
    ///
    /// # Errors
    ///
    /// Returns the matching `Missing*` variant when a required collaborator
    /// was not configured.
    pub fn build(self) -> Result<GatewayHook, HookError> {
        let registry = self.registry.ok_or(HookError::MissingRegistry)?;
        let scanner = self.scanner.ok_or(HookError::MissingScanner)?;
        let agent = self.agent.ok_or(HookError::MissingAgent)?;
        let decision_log = self.decision_log.ok_or(HookError::MissingDecisionLog)?;
        let hmac_key = self.config.hmac_key.clone().unwrap_or_else(generate_hmac_key);
        Ok(GatewayHook {
            registry,
            scanner,
            agent,
            decision_log,
            hmac_key,
            posture: Mutex::new(self.config.initial_posture),
            kill_switch: AtomicBool::new(false),
            outbound_enabled: self.config.outbound_enabled,
            inbound_enabled: self.config.inbound_enabled,
            counters: HookCountersAtomic::default(),
            quarantines: QuarantineStore::new(),
            started_at: Instant::now(),
        })
    }
}

// ============================================================================
// SECTION: Counters
// ============================================================================

/// Atomic mirror of [`HookCounters`]; `pending_quarantines` is derived live
/// from [`QuarantineStore`] rather than tracked here.
#[derive(Default)]
struct HookCountersAtomic {
    /// Total outbound scans performed.
    scans: AtomicU64,
    /// Total outbound requests blocked.
    blocks: AtomicU64,
    /// Total outbound requests quarantined.
    quarantines: AtomicU64,
    /// Total errors absorbed fail-closed.
    errors: AtomicU64,
}

impl HookCountersAtomic {
    /// Takes a consistent-enough snapshot for a health report.
    fn snapshot(&self, pending_quarantines: u64) -> HookCounters {
        HookCounters {
            scans: self.scans.load(Ordering::Relaxed),
            blocks: self.blocks.load(Ordering::Relaxed),
            quarantines: self.quarantines.load(Ordering::Relaxed),
            pending_quarantines,
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// SECTION: Gateway Hook
// ============================================================================

/// Posture-driven decision engine over a scanner, security agent, and
/// decision logger.
pub struct GatewayHook {
    /// Registry handle exposed to callers via `get_registry`.
    registry: Arc<dyn Registry + Send + Sync>,
    /// Layer 1 pattern scanner.
    scanner: Arc<dyn Scanner + Send + Sync>,
    /// Layer 2 security agent.
    agent: Arc<dyn SecurityAgent + Send + Sync>,
    /// Decision logger.
    decision_log: Arc<dyn DecisionLog + Send + Sync>,
    /// Key signing approval tokens and quarantine content hashes.
    hmac_key: Vec<u8>,
    /// Current posture.
    posture: Mutex<Posture>,
    /// When engaged, every outbound scan resolves to `block`.
    kill_switch: AtomicBool,
    /// Whether outbound scanning is active.
    outbound_enabled: bool,
    /// Whether inbound inspection is active.
    inbound_enabled: bool,
    /// Operation counters.
    counters: HookCountersAtomic,
    /// Held outbound requests awaiting operator decision.
    quarantines: QuarantineStore,
    /// Construction time, for uptime reporting.
    started_at: Instant,
}

impl GatewayHook {
    /// Returns a builder for the gateway hook.
    #[must_use]
    pub fn builder() -> GatewayHookBuilder {
        GatewayHookBuilder::default()
    }

    /// Scans and gates outbound content under the current posture.
    ///
    /// Never panics and never propagates scanner or agent failures; any
    /// failure resolves to a synthetic `err`-prefixed quarantine.
    pub fn scan_outbound(&self, request: OutboundRequest) -> OutboundResult {
        self.counters.scans.fetch_add(1, Ordering::Relaxed);

        if !self.outbound_enabled {
            return self.allow_without_scanning(&request);
        }

        let scan_result = self.scanner.scan(&request.content, None);
        if scan_result.verdict == Verdict::Error {
            let message = scan_result.error.clone().unwrap_or_else(|| "scan error".to_string());
            return self.fail_closed(&request, message, scan_result.duration_ms);
        }

        let agent_outcome = self.agent.analyze(&request.content, &scan_result);
        let highest = if scan_result.flags.is_empty() { None } else { Some(agent_outcome.overall) };

        let action = if self.kill_switch.load(Ordering::Relaxed) {
            Action::Block
        } else {
            decision::decide(highest, request.destination, self.get_posture())
        };

        let result = match action {
            Action::Allow => match self.mint_allow_token(&request.request_id, highest.unwrap_or(Classification::Public)) {
                Ok(token) => OutboundResult {
                    request_id: request.request_id.clone(),
                    action,
                    verdict: scan_result.verdict,
                    flags: scan_result.flags.clone(),
                    highest_classification: highest,
                    approval_token: Some(token),
                    quarantine_id: None,
                    error: None,
                },
                Err(err) => return self.fail_closed(&request, err.to_string(), scan_result.duration_ms),
            },
            Action::Quarantine => self.quarantine_outbound(&request, &scan_result, highest),
            Action::Block => {
                self.counters.blocks.fetch_add(1, Ordering::Relaxed);
                OutboundResult {
                    request_id: request.request_id.clone(),
                    action,
                    verdict: scan_result.verdict,
                    flags: scan_result.flags.clone(),
                    highest_classification: highest,
                    approval_token: None,
                    quarantine_id: None,
                    error: None,
                }
            }
        };

        self.log_outbound(&request, &result, scan_result.duration_ms);
        result
    }

    /// Builds the allow-everything result used when outbound scanning is
    /// disabled by configuration.
    fn allow_without_scanning(&self, request: &OutboundRequest) -> OutboundResult {
        let token = self.mint_allow_token(&request.request_id, Classification::Public).ok();
        OutboundResult {
            request_id: request.request_id.clone(),
            action: Action::Allow,
            verdict: Verdict::Clean,
            flags: Vec::new(),
            highest_classification: None,
            approval_token: token,
            quarantine_id: None,
            error: None,
        }
    }

    /// Mints an approval token under the hook's HMAC key.
    fn mint_allow_token(&self, request_id: &dlp_core::RequestId, classification: Classification) -> Result<String, HookError> {
        token::mint_approval_token(&self.hmac_key, request_id, classification)
    }

    /// Builds and stores a quarantine entry for an `Action::Quarantine`
    /// decision, recording the creation event.
    fn quarantine_outbound(
        &self,
        request: &OutboundRequest,
        scan_result: &dlp_core::ScanResult,
        highest: Option<Classification>,
    ) -> OutboundResult {
        self.counters.quarantines.fetch_add(1, Ordering::Relaxed);
        let content_hash = token::hmac_hex(&self.hmac_key, request.content.as_bytes()).unwrap_or_default();
        let id = QuarantineId::new(quarantine::mint_id("quar"));
        self.quarantines.insert(QuarantineEntry {
            id: id.clone(),
            request_id: request.request_id.clone(),
            content_hash,
            content_length: request.content.len(),
            destination: request.destination,
            target: request.target.clone(),
            flags: scan_result.flags.clone(),
            highest_classification: highest,
            created_at: Timestamp::now(),
            status: QuarantineStatus::Pending,
            resolved_at: None,
            resolved_by: None,
        });
        let result = OutboundResult {
            request_id: request.request_id.clone(),
            action: Action::Quarantine,
            verdict: scan_result.verdict,
            flags: scan_result.flags.clone(),
            highest_classification: highest,
            approval_token: None,
            quarantine_id: Some(id.clone()),
            error: None,
        };
        self.log_quarantine_created(request, &id, highest);
        result
    }

    /// Produces the synthetic `err`-prefixed quarantine used whenever the
    /// scan itself failed. Never upgraded to allow.
    fn fail_closed(&self, request: &OutboundRequest, message: String, duration_ms: u64) -> OutboundResult {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        let content_hash = token::hmac_hex(&self.hmac_key, request.content.as_bytes()).unwrap_or_default();
        let id = QuarantineId::new(quarantine::mint_id("err"));
        self.quarantines.insert(QuarantineEntry {
            id: id.clone(),
            request_id: request.request_id.clone(),
            content_hash,
            content_length: request.content.len(),
            destination: request.destination,
            target: request.target.clone(),
            flags: Vec::new(),
            highest_classification: None,
            created_at: Timestamp::now(),
            status: QuarantineStatus::Pending,
            resolved_at: None,
            resolved_by: None,
        });
        let result = OutboundResult {
            request_id: request.request_id.clone(),
            action: Action::Quarantine,
            verdict: Verdict::Error,
            flags: Vec::new(),
            highest_classification: None,
            approval_token: None,
            quarantine_id: Some(id.clone()),
            error: Some(message),
        };
        self.log_outbound(request, &result, duration_ms);
        self.log_quarantine_created(request, &id, None);
        result
    }

    /// Passively inspects inbound content; never blocks, only informs.
    pub fn inspect_inbound(&self, request: InboundRequest) -> InboundResult {
        if !self.inbound_enabled {
            return InboundResult {
                request_id: request.request_id,
                detected: false,
                flags: Vec::new(),
                highest_classification: None,
                recommended_posture: None,
            };
        }

        let scan_result = self.scanner.scan(&request.content, None);
        let (detected, flags, highest) = if scan_result.verdict == Verdict::Flagged {
            (true, scan_result.flags.clone(), scan_result.highest_classification)
        } else {
            (false, Vec::new(), None)
        };
        let result = InboundResult {
            request_id: request.request_id.clone(),
            detected,
            flags,
            highest_classification: highest,
            recommended_posture: recommend_posture(highest),
        };
        self.log_inbound(&request, &result, scan_result.duration_ms);
        result
    }

    /// Returns the quarantine entry for `id`, if any.
    #[must_use]
    pub fn get_quarantine(&self, id: &QuarantineId) -> Option<QuarantineEntry> {
        self.quarantines.get(id)
    }

    /// Returns every quarantine entry still `pending`.
    #[must_use]
    pub fn list_pending_quarantines(&self) -> Vec<QuarantineEntry> {
        self.quarantines.list_pending()
    }

    /// Approves a pending quarantine entry, minting a fresh approval token.
    /// Returns `None` when `id` is unknown or already resolved.
    pub fn approve_quarantine(&self, id: &QuarantineId, approver: &str) -> Option<String> {
        let entry = self.quarantines.approve(id, approver)?;
        let classification = entry.highest_classification.unwrap_or(Classification::Public);
        let token = self.mint_allow_token(&entry.request_id, classification).ok()?;
        self.log_quarantine_resolution(&entry, DecisionType::QuarantineApproved, approver);
        Some(token)
    }

    /// Rejects a pending quarantine entry. Returns `false` when `id` is
    /// unknown or already resolved.
    pub fn reject_quarantine(&self, id: &QuarantineId, rejector: &str) -> bool {
        let resolved = self.quarantines.reject(id, rejector);
        if resolved && let Some(entry) = self.quarantines.get(id) {
            self.log_quarantine_resolution(&entry, DecisionType::QuarantineRejected, rejector);
        }
        resolved
    }

    /// Sets the current posture, recording the transition when it changes.
    pub fn set_posture(&self, posture: Posture, actor: &str) {
        let previous = {
            let mut guard = self.posture.lock().unwrap_or_else(PoisonError::into_inner);
            let previous = *guard;
            *guard = posture;
            previous
        };
        if previous == posture {
            return;
        }
        let mut record = DecisionLogRecord::new(DecisionType::PostureChanged, Timestamp::now());
        record.operator = Some(actor.to_string());
        record.previous_state = Some(posture_label(previous).to_string());
        record.new_state = Some(posture_label(posture).to_string());
        if let Err(err) = self.decision_log.record(record) {
            warn!("failed to record posture change: {err}");
        }
    }

    /// Returns the current posture.
    #[must_use]
    pub fn get_posture(&self) -> Posture {
        *self.posture.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Engages the kill switch; every subsequent outbound scan blocks.
    pub fn engage_kill_switch(&self, actor: &str) {
        let was_engaged = self.kill_switch.swap(true, Ordering::Relaxed);
        if !was_engaged {
            self.log_kill_switch(DecisionType::KillSwitchOn, actor);
        }
    }

    /// Disengages the kill switch.
    pub fn disengage_kill_switch(&self, actor: &str) {
        let was_engaged = self.kill_switch.swap(false, Ordering::Relaxed);
        if was_engaged {
            self.log_kill_switch(DecisionType::KillSwitchOff, actor);
        }
    }

    /// Returns whether the kill switch is currently engaged.
    #[must_use]
    pub fn kill_switch_engaged(&self) -> bool {
        self.kill_switch.load(Ordering::Relaxed)
    }

    /// Rebuilds the scanner's detector set from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] when the registry cannot be read.
    pub fn reload(&self) -> Result<(), ScanError> {
        self.scanner.reload()
    }

    /// Returns a handle to the registry, for administrative callers.
    #[must_use]
    pub fn get_registry(&self) -> Arc<dyn Registry + Send + Sync> {
        Arc::clone(&self.registry)
    }

    /// Returns an aggregate health snapshot.
    #[must_use]
    pub fn get_health(&self) -> HealthStatus {
        HealthStatus {
            initialized: true,
            outbound_enabled: self.outbound_enabled,
            inbound_enabled: self.inbound_enabled,
            kill_switch_engaged: self.kill_switch_engaged(),
            posture: self.get_posture(),
            counters: self.counters.snapshot(self.quarantines.pending_count()),
            uptime_ms: elapsed_ms(self.started_at),
        }
    }

    /// Records the `outbound_scan` event for every outbound decision.
    fn log_outbound(&self, request: &OutboundRequest, result: &OutboundResult, duration_ms: u64) {
        let mut record = DecisionLogRecord::new(DecisionType::OutboundScan, Timestamp::now());
        record.request_id = Some(request.request_id.clone());
        record.action = Some(result.action);
        record.verdict = Some(result.verdict);
        record.destination = Some(request.destination);
        record.target.clone_from(&request.target);
        record.content_length = Some(request.content.len());
        record.flag_count = Some(result.flags.len());
        record.highest_classification = result.highest_classification;
        record.duration_ms = Some(duration_ms);
        record.quarantine_id.clone_from(&result.quarantine_id);
        if !result.flags.is_empty() {
            record.flag_details = Some(result.flags.iter().map(SanitizedFlag::from).collect());
        }
        if let Err(err) = self.decision_log.record(record) {
            warn!("failed to record outbound decision: {err}");
        }
    }

    /// Records the `quarantine_created` event alongside an outbound
    /// quarantine decision.
    fn log_quarantine_created(&self, request: &OutboundRequest, id: &QuarantineId, highest: Option<Classification>) {
        let mut record = DecisionLogRecord::new(DecisionType::QuarantineCreated, Timestamp::now());
        record.request_id = Some(request.request_id.clone());
        record.quarantine_id = Some(id.clone());
        record.destination = Some(request.destination);
        record.highest_classification = highest;
        if let Err(err) = self.decision_log.record(record) {
            warn!("failed to record quarantine creation: {err}");
        }
    }

    /// Records an `quarantine_approved`/`quarantine_rejected` event.
    fn log_quarantine_resolution(&self, entry: &QuarantineEntry, decision_type: DecisionType, operator: &str) {
        let mut record = DecisionLogRecord::new(decision_type, Timestamp::now());
        record.request_id = Some(entry.request_id.clone());
        record.quarantine_id = Some(entry.id.clone());
        record.operator = Some(operator.to_string());
        record.highest_classification = entry.highest_classification;
        record.destination = Some(entry.destination);
        if let Err(err) = self.decision_log.record(record) {
            warn!("failed to record quarantine resolution: {err}");
        }
    }

    /// Records a `kill_switch_on`/`kill_switch_off` event.
    fn log_kill_switch(&self, decision_type: DecisionType, actor: &str) {
        let mut record = DecisionLogRecord::new(decision_type, Timestamp::now());
        record.operator = Some(actor.to_string());
        if let Err(err) = self.decision_log.record(record) {
            warn!("failed to record kill switch transition: {err}");
        }
    }

    /// Records the `inbound_inspect` event for every inbound inspection.
    fn log_inbound(&self, request: &InboundRequest, result: &InboundResult, duration_ms: u64) {
        let mut record = DecisionLogRecord::new(DecisionType::InboundInspect, Timestamp::now());
        record.request_id = Some(request.request_id.clone());
        record.content_length = Some(request.content.len());
        record.flag_count = Some(result.flags.len());
        record.highest_classification = result.highest_classification;
        record.duration_ms = Some(duration_ms);
        if !result.flags.is_empty() {
            record.flag_details = Some(result.flags.iter().map(SanitizedFlag::from).collect());
        }
        if let Err(err) = self.decision_log.record(record) {
            warn!("failed to record inbound inspection: {err}");
        }
    }
}

/// Stable lowercase label for a posture, used in audit records.
const fn posture_label(posture: Posture) -> &'static str {
    match posture {
        Posture::Permissive => "permissive",
        Posture::Standard => "standard",
        Posture::Strict => "strict",
        Posture::Lockdown => "lockdown",
    }
}

/// Milliseconds elapsed since `started`, saturating at `u64::MAX`.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
