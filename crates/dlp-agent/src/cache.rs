// crates/dlp-agent/src/cache.rs
// ============================================================================
// Module: Security Agent TTL Cache
// Description: In-memory cache of per-flag analyses keyed by content and match.
// Purpose: Avoid repeat model calls for the same (pattern_type, matched_text, content) triple.
// Dependencies: dlp-core
// ============================================================================

//! ## Overview
//! `content_hash` is deliberately non-cryptographic: the cache key only needs
//! to distinguish different content within a single process lifetime, not
//! resist adversarial collision.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use dlp_core::FlagAnalysis;
use dlp_core::Timestamp;

/// Key identifying a cached analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Pattern type or entry label that produced the flag.
    pub pattern_type: String,
    /// Exact matched text.
    pub matched_text: String,
    /// Deterministic hash of the full scanned content.
    pub content_hash: u64,
}

/// Computes a deterministic, non-cryptographic hash of `content`.
#[must_use]
pub fn content_hash(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

struct Entry {
    analysis: FlagAnalysis,
    expires_at_ms: i64,
}

/// TTL-bounded cache of flag analyses, soft-capped by entry count.
pub struct AnalysisCache {
    entries: HashMap<CacheKey, Entry>,
    soft_cap: usize,
}

impl AnalysisCache {
    /// Builds an empty cache with the given soft capacity.
    #[must_use]
    pub fn new(soft_cap: usize) -> Self {
        Self { entries: HashMap::new(), soft_cap }
    }

    /// Returns the cached analysis for `key`, if present and unexpired.
    pub fn get(&mut self, key: &CacheKey) -> Option<FlagAnalysis> {
        let now = Timestamp::now().as_unix_millis();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at_ms > now => Some(entry.analysis.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Inserts an analysis with the given TTL, pruning expired entries first
    /// if the cache exceeds its soft cap.
    pub fn insert(&mut self, key: CacheKey, analysis: FlagAnalysis, ttl_ms: u64) {
        if self.entries.len() >= self.soft_cap {
            self.prune_expired();
        }
        let expires_at_ms = Timestamp::now().as_unix_millis().saturating_add(i64::try_from(ttl_ms).unwrap_or(i64::MAX));
        self.entries.insert(key, Entry { analysis, expires_at_ms });
    }

    fn prune_expired(&mut self) {
        let now = Timestamp::now().as_unix_millis();
        self.entries.retain(|_, entry| entry.expires_at_ms > now);
    }
}

#[cfg(test)]
mod tests {
    use super::AnalysisCache;
    use super::CacheKey;
    use dlp_core::Classification;
    use dlp_core::FlagAnalysis;

    fn sample_analysis() -> FlagAnalysis {
        FlagAnalysis { flag_index: 0, classification: Classification::AskFirst, confidence: 0.9, reasoning: "test".to_string(), cached: false }
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let mut cache = AnalysisCache::new(10);
        let key = CacheKey { pattern_type: "ssn".to_string(), matched_text: "123".to_string(), content_hash: 1 };
        cache.insert(key.clone(), sample_analysis(), 0);
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn unexpired_entry_round_trips() {
        let mut cache = AnalysisCache::new(10);
        let key = CacheKey { pattern_type: "ssn".to_string(), matched_text: "123".to_string(), content_hash: 1 };
        cache.insert(key.clone(), sample_analysis(), 60_000);
        assert_eq!(cache.get(&key).map(|a| a.classification), Some(Classification::AskFirst));
    }
}
