// crates/dlp-hook/src/quarantine.rs
// ============================================================================
// Module: Quarantine Store
// Description: In-memory holding area for outbound content awaiting operator decision.
// Purpose: Track pending/approved/rejected quarantine entries keyed by id.
// Dependencies: dlp-core, rand, hex
// ============================================================================

//! ## Overview
//! Quarantine entries never outlive the process: nothing here is persisted.
//! Transitions out of `pending` are terminal; a single mutex serializes
//! approve/reject races so concurrent callers see a consistent outcome.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use dlp_core::QuarantineEntry;
use dlp_core::QuarantineId;
use dlp_core::QuarantineStatus;
use dlp_core::Timestamp;
use rand::RngCore;
use rand::rngs::OsRng;

/// In-memory table of quarantine entries keyed by id.
pub(crate) struct QuarantineStore {
    /// Entries by id; guarded by a single mutex for terminal-state safety.
    entries: Mutex<HashMap<QuarantineId, QuarantineEntry>>,
}

impl QuarantineStore {
    /// Builds an empty store.
    pub(crate) fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// Inserts a freshly created entry.
    pub(crate) fn insert(&self, entry: QuarantineEntry) {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(entry.id.clone(), entry);
    }

    /// Returns a copy of the entry with `id`, if any.
    pub(crate) fn get(&self, id: &QuarantineId) -> Option<QuarantineEntry> {
        let guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.get(id).cloned()
    }

    /// Transitions `id` from `pending` to `approved`, stamping the resolver
    /// and time. Returns `None` if `id` is unknown or already resolved.
    pub(crate) fn approve(&self, id: &QuarantineId, approver: &str) -> Option<QuarantineEntry> {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = guard.get_mut(id)?;
        if entry.status != QuarantineStatus::Pending {
            return None;
        }
        entry.status = QuarantineStatus::Approved;
        entry.resolved_at = Some(Timestamp::now());
        entry.resolved_by = Some(approver.to_string());
        Some(entry.clone())
    }

    /// Transitions `id` from `pending` to `rejected`, stamping the resolver
    /// and time. Returns `false` if `id` is unknown or already resolved.
    pub(crate) fn reject(&self, id: &QuarantineId, rejector: &str) -> bool {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = guard.get_mut(id) else { return false };
        if entry.status != QuarantineStatus::Pending {
            return false;
        }
        entry.status = QuarantineStatus::Rejected;
        entry.resolved_at = Some(Timestamp::now());
        entry.resolved_by = Some(rejector.to_string());
        true
    }

    /// Returns every entry still `pending`.
    pub(crate) fn list_pending(&self) -> Vec<QuarantineEntry> {
        let guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.values().filter(|entry| entry.status == QuarantineStatus::Pending).cloned().collect()
    }

    /// Counts entries still `pending`, for health snapshots.
    pub(crate) fn pending_count(&self) -> u64 {
        let guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let count = guard.values().filter(|entry| entry.status == QuarantineStatus::Pending).count();
        u64::try_from(count).unwrap_or(u64::MAX)
    }
}

/// Mints a `<prefix>-<8hex>` identifier from four random bytes.
pub(crate) fn mint_id(prefix: &str) -> String {
    let mut bytes = [0u8; 4];
    OsRng.fill_bytes(&mut bytes);
    format!("{prefix}-{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::QuarantineStore;
    use super::mint_id;
    use dlp_core::Destination;
    use dlp_core::QuarantineEntry;
    use dlp_core::QuarantineId;
    use dlp_core::QuarantineStatus;
    use dlp_core::RequestId;
    use dlp_core::Timestamp;

    fn sample_entry(id: &str) -> QuarantineEntry {
        QuarantineEntry {
            id: QuarantineId::new(id),
            request_id: RequestId::new("req-1"),
            content_hash: "deadbeef".to_string(),
            content_length: 10,
            destination: Destination::Email,
            target: None,
            flags: Vec::new(),
            highest_classification: None,
            created_at: Timestamp::now(),
            status: QuarantineStatus::Pending,
            resolved_at: None,
            resolved_by: None,
        }
    }

    #[test]
    fn mint_id_uses_the_given_prefix() {
        assert!(mint_id("quar").starts_with("quar-"));
        assert!(mint_id("err").starts_with("err-"));
    }

    #[test]
    fn approve_transitions_from_pending_once() {
        let store = QuarantineStore::new();
        let id = QuarantineId::new("quar-1");
        store.insert(sample_entry("quar-1"));
        assert!(store.approve(&id, "admin").is_some());
        assert!(store.approve(&id, "other").is_none());
        let Some(entry) = store.get(&id) else { unreachable!("entry must exist") };
        assert_eq!(entry.status, QuarantineStatus::Approved);
        assert_eq!(entry.resolved_by.as_deref(), Some("admin"));
    }

    #[test]
    fn reject_transitions_from_pending_once() {
        let store = QuarantineStore::new();
        let id = QuarantineId::new("quar-2");
        store.insert(sample_entry("quar-2"));
        assert!(store.reject(&id, "reviewer"));
        assert!(!store.reject(&id, "other"));
    }

    #[test]
    fn approve_after_reject_fails() {
        let store = QuarantineStore::new();
        let id = QuarantineId::new("quar-3");
        store.insert(sample_entry("quar-3"));
        assert!(store.reject(&id, "reviewer"));
        assert!(store.approve(&id, "admin").is_none());
    }

    #[test]
    fn list_pending_excludes_resolved_entries() {
        let store = QuarantineStore::new();
        store.insert(sample_entry("quar-4"));
        store.insert(sample_entry("quar-5"));
        let id = QuarantineId::new("quar-4");
        assert!(store.approve(&id, "admin").is_some());
        let pending = store.list_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, QuarantineId::new("quar-5"));
    }

    #[test]
    fn pending_count_reflects_resolutions() {
        let store = QuarantineStore::new();
        store.insert(sample_entry("quar-6"));
        assert_eq!(store.pending_count(), 1);
        assert!(store.reject(&QuarantineId::new("quar-6"), "reviewer"));
        assert_eq!(store.pending_count(), 0);
    }
}
