// crates/dlp-scanner/src/fuzzy.rs
// ============================================================================
// Module: Fuzzy Entry Search (Auxiliary)
// Description: Levenshtein-distance approximate matching against the loaded entry index.
// Purpose: Help operators find registry entries similar to a candidate value without affecting scan verdicts.
// Dependencies: none
// ============================================================================

//! ## Overview
//! This search is explicitly auxiliary: it never participates in
//! [`dlp_core::Scanner::scan`] and must never change a scan verdict. It exists
//! so operator tooling can ask "is this candidate value close to something
//! already in the registry?" — useful for catching near-duplicate entries or
//! confirming a near-miss was intentionally left out of the exact-match
//! index.

use crate::detector::CompiledEntry;

/// A registry entry or variant within `max_distance` of a queried value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    /// Label of the matching entry.
    pub label: String,
    /// The entry's primary value or variant text that matched.
    pub matched_value: String,
    /// Levenshtein distance between `needle` and `matched_value`.
    pub distance: usize,
}

/// Compares `needle` against every loaded entry's primary value and variants,
/// returning every match within `max_distance`, nearest first.
#[must_use]
pub(crate) fn fuzzy_search_entries(entries: &[CompiledEntry], needle: &str, max_distance: usize) -> Vec<FuzzyMatch> {
    let needle_lower: Vec<char> = needle.to_lowercase().chars().collect();
    if needle_lower.is_empty() {
        return Vec::new();
    }
    let mut matches = Vec::new();
    for entry in entries {
        let primary_chars: Vec<char> = entry.primary_value_lower.chars().collect();
        let distance = levenshtein(&needle_lower, &primary_chars);
        if distance <= max_distance {
            matches.push(FuzzyMatch { label: entry.label.clone(), matched_value: entry.primary_value_lower.clone(), distance });
        }
        for variant in &entry.variant_values_lower {
            let variant_chars: Vec<char> = variant.chars().collect();
            let distance = levenshtein(&needle_lower, &variant_chars);
            if distance <= max_distance {
                matches.push(FuzzyMatch { label: entry.label.clone(), matched_value: variant.clone(), distance });
            }
        }
    }
    matches.sort_by_key(|m| m.distance);
    matches
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut previous_row: Vec<usize> = (0..=b.len()).collect();
    let mut current_row = vec![0usize; b.len() + 1];
    for (i, a_char) in a.iter().enumerate() {
        current_row[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current_row[j + 1] =
                (previous_row[j + 1] + 1).min(current_row[j] + 1).min(previous_row[j] + cost);
        }
        std::mem::swap(&mut previous_row, &mut current_row);
    }
    previous_row[b.len()]
}
