// crates/dlp-agent/src/parse.rs
// ============================================================================
// Module: Security Agent Response Parsing
// Description: Extracts and normalizes the classification JSON object from a model reply.
// Purpose: Tolerate code-fenced or chatty responses while enforcing the expected field shape.
// Dependencies: dlp-core, serde_json
// ============================================================================

//! ## Overview
//! Models frequently wrap JSON in markdown code fences or add leading/trailing
//! prose despite instructions. [`extract_classification_fields`] locates the
//! first balanced `{...}` object in the raw text before parsing it.

use dlp_core::AgentError;
use dlp_core::Classification;
use dlp_core::normalize_classification;

/// Normalized fields extracted from a model response.
pub struct ClassificationFields {
    /// Normalized classification; unknown labels fall back to `ASK_FIRST`.
    pub classification: Classification,
    /// Raw confidence value, not yet clamped.
    pub confidence: f64,
    /// Reasoning text, or a placeholder when absent.
    pub reasoning: String,
}

/// Locates the first balanced JSON object in `raw`, parses it, and normalizes
/// its fields.
///
/// # Errors
///
/// Returns [`AgentError::ParseError`] when no balanced object is found or the
/// object cannot be parsed as JSON.
pub fn extract_classification_fields(raw: &str) -> Result<ClassificationFields, AgentError> {
    let object_text = first_json_object(raw)
        .ok_or_else(|| AgentError::ParseError("no JSON object found in model response".to_string()))?;
    let value: serde_json::Value =
        serde_json::from_str(object_text).map_err(|err| AgentError::ParseError(err.to_string()))?;

    let classification_raw = value.get("classification").and_then(serde_json::Value::as_str).unwrap_or("");
    let confidence = value.get("confidence").and_then(serde_json::Value::as_f64).unwrap_or(0.5);
    let reasoning = value
        .get("reasoning")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("no reasoning provided")
        .to_string();

    Ok(ClassificationFields { classification: normalize_classification(classification_raw), confidence, reasoning })
}

/// Scans `raw` for the first balanced `{...}` substring, accounting for
/// braces inside quoted strings.
fn first_json_object(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    let start = raw.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
