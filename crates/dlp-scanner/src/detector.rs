// crates/dlp-scanner/src/detector.rs
// ============================================================================
// Module: Compiled Detector Set
// Description: Regex compilation and entry/variant indexing for the pattern scanner.
// Purpose: Turn registry rows into the structures the scan loop runs against.
// Dependencies: dlp-core, regex
// ============================================================================

//! ## Overview
//! Patterns that fail to compile are skipped, not fatal: their `(pattern_type,
//! reason)` pairs are retained for [`dlp_core::Scanner::compile_failures`].

use dlp_core::Classification;
use dlp_core::EntryVariant;
use dlp_core::Pattern;
use dlp_core::UserEntry;
use regex::Regex;
use regex::RegexBuilder;

/// A pattern with its regex compiled, ready to scan.
pub struct CompiledPattern {
    /// Compiled regular expression.
    pub regex: Regex,
    /// Pattern type label, used as the flag label.
    pub pattern_type: String,
    /// Stable id of the owning locale, used for locale filtering.
    pub locale_stable_id: Option<String>,
    /// Classification applied to matches.
    pub default_classification: Classification,
}

/// An active entry with its primary value and variants lowercased for
/// case-insensitive substring search.
pub struct CompiledEntry {
    /// Entry label, used as the flag label.
    pub label: String,
    /// Lowercased primary value.
    pub primary_value_lower: String,
    /// Lowercased variant texts.
    pub variant_values_lower: Vec<String>,
    /// Classification applied to matches.
    pub classification: Classification,
}

/// Compiles every pattern with a regex source, returning the compiled set and
/// `(pattern_type, reason)` failures for patterns that failed to compile or
/// carry no regex source at all.
#[must_use]
pub fn compile_patterns(patterns: &[Pattern]) -> (Vec<CompiledPattern>, Vec<(String, String)>) {
    let mut compiled = Vec::new();
    let mut failures = Vec::new();
    for pattern in patterns {
        let Some(source) = &pattern.regex_source else {
            continue;
        };
        let mut builder = RegexBuilder::new(source);
        if let Some(flags) = &pattern.regex_flags {
            builder.case_insensitive(flags.contains('i'));
            builder.multi_line(flags.contains('m'));
            builder.dot_matches_new_line(flags.contains('s'));
        }
        match builder.build() {
            Ok(regex) => compiled.push(CompiledPattern {
                regex,
                pattern_type: pattern.pattern_type.clone(),
                locale_stable_id: Some(pattern.locale_stable_id.clone()),
                default_classification: pattern.default_classification,
            }),
            Err(err) => failures.push((pattern.pattern_type.clone(), err.to_string())),
        }
    }
    (compiled, failures)
}

/// Indexes active entries and their variants for substring search.
#[must_use]
pub fn compile_entries(entries: &[(UserEntry, Vec<EntryVariant>)]) -> Vec<CompiledEntry> {
    entries
        .iter()
        .map(|(entry, variants)| CompiledEntry {
            label: entry.label.clone(),
            primary_value_lower: entry.primary_value.to_lowercase(),
            variant_values_lower: variants.iter().map(|v| v.variant_text.to_lowercase()).collect(),
            classification: entry.classification,
        })
        .collect()
}
