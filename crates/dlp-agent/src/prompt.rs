// crates/dlp-agent/src/prompt.rs
// ============================================================================
// Module: Security Agent Prompt Construction
// Description: Builds the chat-completions request body for a single flag.
// Purpose: Give the model a fixed instruction plus per-flag context to re-classify a match.
// Dependencies: dlp-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The system instruction is fixed and enumerates the four classifications
//! plus common false-positive heuristics (documentation examples, test
//! fixtures, placeholder values). Only the user message varies per flag.

use dlp_core::Flag;
use serde::Serialize;

use crate::LlmAgentConfig;

const SYSTEM_INSTRUCTION: &str = "You are a data-loss-prevention classifier. Given a detected \
match, decide whether it is a real sensitive value, a false positive, or a documentation/test \
example. Respond with a single JSON object: {\"classification\": one of NEVER_SHARE, ASK_FIRST, \
INTERNAL_ONLY, PUBLIC, \"confidence\": a number between 0 and 1, \"reasoning\": a short \
explanation}. Favor PUBLIC or INTERNAL_ONLY for values that look like documentation examples, \
placeholder data (e.g. 555-xxx numbers, example.com addresses), or test fixtures. Respond with \
JSON only, no other text.";

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

/// Builds the chat-completions request body for a single flag.
pub fn build_request(config: &LlmAgentConfig, flag: &Flag, truncated_content: &str) -> impl Serialize {
    let user_message = format!(
        "pattern_type: {}\nmatched_value: {}\nscanner_context: {}\nscanner_classification: {}\ncontent:\n{}",
        flag.label,
        flag.matched_text,
        flag.context,
        flag.classification.as_str(),
        truncated_content,
    );
    ChatRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage { role: "system", content: SYSTEM_INSTRUCTION.to_string() },
            ChatMessage { role: "user", content: user_message },
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}
