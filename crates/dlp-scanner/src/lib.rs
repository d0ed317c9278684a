// crates/dlp-scanner/src/lib.rs
// ============================================================================
// Module: DLP Watchdog Pattern Scanner
// Description: Layer 1 deterministic regex + exact-substring detector.
// Purpose: Produce a deterministic ScanResult for text against the current compiled detector set.
// Dependencies: dlp-core, regex, tracing
// ============================================================================

//! ## Overview
//! [`PatternScanner`] holds a derived, read-only snapshot of the registry
//! (compiled patterns plus the entry/variant index) behind a `Mutex<Arc<..>>`
//! swapped wholesale on reload, rebuilt only on explicit
//! [`dlp_core::Scanner::reload`]. Scan calls never mutate the registry and
//! never return `Err`; failures become [`dlp_core::Verdict::Error`] results.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod detector;
mod fuzzy;

#[cfg(test)]
mod tests;

pub use fuzzy::FuzzyMatch;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Instant;

use dlp_core::Classification;
use dlp_core::Flag;
use dlp_core::FlagSource;
use dlp_core::Registry;
use dlp_core::ScanError;
use dlp_core::ScanId;
use dlp_core::ScanResult;
use dlp_core::Scanner;
use dlp_core::Timestamp;

use crate::detector::CompiledEntry;
use crate::detector::CompiledPattern;
use crate::detector::compile_entries;
use crate::detector::compile_patterns;

/// Configuration controlling match filtering and scan budget.
#[derive(Debug, Clone, Copy)]
pub struct ScannerConfig {
    /// Matches shorter than this many bytes are discarded.
    pub min_match_length: usize,
    /// Soft ceiling on scan duration, in milliseconds.
    pub max_scan_time_ms: u64,
    /// Characters of context retained on each side of a match.
    pub context_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self { min_match_length: 3, max_scan_time_ms: 5_000, context_size: 30 }
    }
}

struct DetectorSet {
    patterns: Vec<CompiledPattern>,
    entries: Vec<CompiledEntry>,
    compile_failures: Vec<(String, String)>,
}

/// Deterministic regex + exact-substring detector over registry content.
pub struct PatternScanner {
    registry: Arc<dyn Registry + Send + Sync>,
    config: ScannerConfig,
    detectors: Mutex<Arc<DetectorSet>>,
    next_scan_sequence: std::sync::atomic::AtomicU64,
}

impl PatternScanner {
    /// Builds a scanner by loading the current active pattern and entry set
    /// from `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Registry`] when the initial load fails.
    pub fn new(registry: Arc<dyn Registry + Send + Sync>, config: ScannerConfig) -> Result<Self, ScanError> {
        let detectors = load_detectors(registry.as_ref())?;
        Ok(Self {
            registry,
            config,
            detectors: Mutex::new(Arc::new(detectors)),
            next_scan_sequence: std::sync::atomic::AtomicU64::new(0),
        })
    }

    fn mint_scan_id(&self) -> ScanId {
        let seq = self.next_scan_sequence.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        ScanId::new(format!("scan-{}-{seq:08x}", Timestamp::now().as_unix_millis()))
    }

    fn current_detectors(&self) -> Arc<DetectorSet> {
        self.detectors.lock().map(|guard| Arc::clone(&guard)).unwrap_or_else(|poisoned| Arc::clone(&poisoned.into_inner()))
    }

    /// Searches the currently loaded entries and variants for approximate
    /// matches to `needle`, nearest first. Auxiliary operator tooling only:
    /// never called from [`Scanner::scan`] and never affects a scan verdict.
    #[must_use]
    pub fn fuzzy_search(&self, needle: &str, max_distance: usize) -> Vec<FuzzyMatch> {
        fuzzy::fuzzy_search_entries(&self.current_detectors().entries, needle, max_distance)
    }
}

fn load_detectors(registry: &(dyn Registry + Send + Sync)) -> Result<DetectorSet, ScanError> {
    let patterns = registry.list_active_patterns().map_err(ScanError::Registry)?;
    let entries = registry.list_active_entries().map_err(ScanError::Registry)?;
    let (compiled_patterns, compile_failures) = compile_patterns(&patterns);
    let compiled_entries = compile_entries(&entries);
    Ok(DetectorSet { patterns: compiled_patterns, entries: compiled_entries, compile_failures })
}

impl Scanner for PatternScanner {
    fn scan(&self, text: &str, locale: Option<&str>) -> ScanResult {
        let scan_id = self.mint_scan_id();
        let scanned_at = Timestamp::now();
        let input_length = text.len();
        let started = Instant::now();

        if text.is_empty() {
            return ScanResult::clean(scan_id, scanned_at, input_length, 0);
        }

        let detectors = self.current_detectors();
        let mut raw_flags: Vec<Flag> = Vec::new();

        for pattern in &detectors.patterns {
            if let Some(locale_name) = locale
                && pattern.locale_stable_id.as_deref() != Some(locale_name)
            {
                continue;
            }
            if started.elapsed().as_millis() as u64 > self.config.max_scan_time_ms {
                return ScanResult::error(
                    scan_id,
                    scanned_at,
                    input_length,
                    elapsed_ms(started),
                    format!("scan exceeded time budget of {}ms", self.config.max_scan_time_ms),
                );
            }
            scan_pattern(pattern, text, self.config.min_match_length, &mut raw_flags);
        }

        for entry in &detectors.entries {
            if started.elapsed().as_millis() as u64 > self.config.max_scan_time_ms {
                return ScanResult::error(
                    scan_id,
                    scanned_at,
                    input_length,
                    elapsed_ms(started),
                    format!("scan exceeded time budget of {}ms", self.config.max_scan_time_ms),
                );
            }
            scan_entry(entry, text, self.config.min_match_length, &mut raw_flags);
        }

        let flags = dedup_and_contextualize(raw_flags, text, self.config.context_size);
        let duration_ms = elapsed_ms(started);

        if flags.is_empty() {
            ScanResult::clean(scan_id, scanned_at, input_length, duration_ms)
        } else {
            ScanResult::flagged(scan_id, scanned_at, input_length, duration_ms, flags)
        }
    }

    fn reload(&self) -> Result<(), ScanError> {
        let fresh = load_detectors(self.registry.as_ref())?;
        let mut guard = self.detectors.lock().map_err(|_| ScanError::Internal("detector mutex poisoned".into()))?;
        *guard = Arc::new(fresh);
        Ok(())
    }

    fn compile_failures(&self) -> Vec<(String, String)> {
        self.current_detectors().compile_failures.clone()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn scan_pattern(pattern: &CompiledPattern, text: &str, min_match_length: usize, out: &mut Vec<Flag>) {
    let mut cursor = 0usize;
    while cursor <= text.len() {
        let Some(found) = pattern.regex.find_at(text, cursor) else { break };
        let (start, end) = (found.start(), found.end());
        if end - start >= min_match_length {
            out.push(Flag {
                start_index: start,
                end_index: end,
                label: pattern.pattern_type.clone(),
                matched_text: text[start..end].to_string(),
                context: String::new(),
                classification: pattern.default_classification,
                confidence: 1.0,
                source: FlagSource::Pattern,
            });
        }
        cursor = if end > start { end } else { end + 1 };
    }
}

fn scan_entry(entry: &CompiledEntry, text: &str, min_match_length: usize, out: &mut Vec<Flag>) {
    let lower_text = text.to_lowercase();
    find_occurrences(&lower_text, text, &entry.primary_value_lower, entry.classification, 1.0, &entry.label, min_match_length, out);
    for variant in &entry.variant_values_lower {
        find_occurrences(&lower_text, text, variant, entry.classification, 0.95, &entry.label, min_match_length, out);
    }
}

#[allow(clippy::too_many_arguments, reason = "each argument is independently required by the match loop")]
fn find_occurrences(
    lower_text: &str,
    original_text: &str,
    needle_lower: &str,
    classification: Classification,
    confidence: f64,
    label: &str,
    min_match_length: usize,
    out: &mut Vec<Flag>,
) {
    if needle_lower.is_empty() || needle_lower.len() < min_match_length {
        return;
    }
    let mut start = 0usize;
    while let Some(found_at) = lower_text[start..].find(needle_lower) {
        let match_start = start + found_at;
        let match_end = match_start + needle_lower.len();
        out.push(Flag {
            start_index: match_start,
            end_index: match_end,
            label: label.to_string(),
            matched_text: original_text[match_start..match_end].to_string(),
            context: String::new(),
            classification,
            confidence,
            source: FlagSource::Entry,
        });
        start = match_end.max(match_start + 1);
        if start >= lower_text.len() {
            break;
        }
    }
}

fn dedup_and_contextualize(mut flags: Vec<Flag>, text: &str, context_size: usize) -> Vec<Flag> {
    flags.sort_by_key(|flag| (flag.start_index, flag.end_index));
    let mut seen = std::collections::HashSet::new();
    flags.retain(|flag| seen.insert((flag.start_index, flag.end_index, flag.label.clone())));
    for flag in &mut flags {
        flag.context = build_context(text, flag.start_index, flag.end_index, context_size);
    }
    flags
}

fn build_context(text: &str, start: usize, end: usize, context_size: usize) -> String {
    let before_start = text[..start].char_indices().rev().nth(context_size.saturating_sub(1)).map_or(0, |(idx, _)| idx);
    let after_end = text[end..]
        .char_indices()
        .nth(context_size)
        .map_or(text.len(), |(idx, _)| end + idx);
    let prefix = if before_start > 0 { "..." } else { "" };
    let suffix = if after_end < text.len() { "..." } else { "" };
    format!("{prefix}{}[{}]{}{suffix}", &text[before_start..start], &text[start..end], &text[end..after_end])
}
