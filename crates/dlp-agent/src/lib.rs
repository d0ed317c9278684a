// crates/dlp-agent/src/lib.rs
// ============================================================================
// Module: DLP Watchdog Security Agent
// Description: Layer 2 contextual reclassifier backed by an external language model.
// Purpose: Re-score scanner flags via an LM chat-completions endpoint with a fail-closed fallback.
// Dependencies: dlp-core, reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`LlmSecurityAgent`] never returns `Err` from [`dlp_core::SecurityAgent::analyze`];
//! every failure mode (disabled, unreachable, timeout, malformed response) is
//! absorbed into a flag-level fallback carrying the scanner's own
//! classification. A TTL cache keyed on `(pattern_type, matched_text,
//! content_hash)` avoids re-asking the model about the same flag in the same
//! content.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod cache;
mod parse;
mod prompt;


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use dlp_core::AgentError;
use dlp_core::AgentOutcome;
use dlp_core::Classification;
use dlp_core::FlagAnalysis;
use dlp_core::ScanResult;
use dlp_core::SecurityAgent;
use dlp_core::clamp_confidence;
use reqwest::blocking::Client;
use tracing::warn;

use crate::cache::AnalysisCache;
use crate::cache::CacheKey;
use crate::cache::content_hash;
use crate::parse::extract_classification_fields;

/// Fallback reasoning text used whenever the model call fails in any way.
const FALLBACK_REASONING: &str = "LLM analysis failed / using scanner classification";

/// Reasoning text used when the agent is administratively disabled.
const DISABLED_REASONING: &str = "agent disabled";

/// Confidence assigned to a fail-closed fallback analysis.
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Configuration for [`LlmSecurityAgent`].
#[derive(Debug, Clone)]
pub struct LlmAgentConfig {
    /// When false, `analyze` returns a passthrough result with no model calls.
    pub enabled: bool,
    /// Root URL of the language-model service (e.g. `http://localhost:11434`).
    pub base_url: String,
    /// Model identifier sent in the chat-completions request.
    pub model: String,
    /// Per-request timeout, covering connect and read.
    pub timeout_ms: u64,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature; kept low for consistent classification.
    pub temperature: f64,
    /// Content is truncated to this many bytes before being sent to the model.
    pub max_content_length: usize,
    /// Cache entry lifetime in milliseconds; `0` disables caching.
    pub cache_ttl_ms: u64,
    /// Soft cap on cache size; expired entries are pruned once exceeded.
    pub cache_max_entries: usize,
    /// Optional bearer token for the model service.
    pub api_key: Option<String>,
}

impl Default for LlmAgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            timeout_ms: 30_000,
            max_tokens: 256,
            temperature: 0.0,
            max_content_length: 4_000,
            cache_ttl_ms: 300_000,
            cache_max_entries: 1_000,
            api_key: None,
        }
    }
}

/// Contextual re-classifier that asks an external LM whether each scanner
/// flag is a real sensitive value, a false positive, or a documentation
/// example.
pub struct LlmSecurityAgent {
    config: LlmAgentConfig,
    client: Client,
    cache: Mutex<AnalysisCache>,
}

impl LlmSecurityAgent {
    /// Builds an agent with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Unavailable`] when the HTTP client cannot be built.
    pub fn new(config: LlmAgentConfig) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| AgentError::Unavailable(err.to_string()))?;
        let cache = Mutex::new(AnalysisCache::new(config.cache_max_entries));
        Ok(Self { config, client, cache })
    }

    fn analyze_one_flag(&self, content: &str, flag_index: usize, flag: &dlp_core::Flag) -> FlagAnalysis {
        let hash = content_hash(content);
        let key = CacheKey { pattern_type: flag.label.clone(), matched_text: flag.matched_text.clone(), content_hash: hash };

        if self.config.cache_ttl_ms > 0
            && let Some(mut cached) = self.cache.lock().ok().and_then(|mut guard| guard.get(&key))
        {
            cached.cached = true;
            return cached;
        }

        let analysis = self.call_model(content, flag_index, flag).unwrap_or_else(|err| {
            warn!(error = %err, pattern_type = %flag.label, "security agent fallback to scanner classification");
            fallback_analysis(flag_index, flag.classification)
        });

        if self.config.cache_ttl_ms > 0
            && let Ok(mut guard) = self.cache.lock()
        {
            guard.insert(key, analysis.clone(), self.config.cache_ttl_ms);
        }
        analysis
    }

    fn call_model(&self, content: &str, flag_index: usize, flag: &dlp_core::Flag) -> Result<FlagAnalysis, AgentError> {
        let truncated = truncate_content(content, self.config.max_content_length);
        let request_body = prompt::build_request(&self.config, flag, &truncated);

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().map_err(|err| AgentError::Unavailable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(AgentError::Unavailable(format!("model service returned status {}", response.status())));
        }
        let body: serde_json::Value = response.json().map_err(|err| AgentError::ParseError(err.to_string()))?;
        let raw_content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| AgentError::ParseError("response missing choices[0].message.content".to_string()))?;

        let fields = extract_classification_fields(raw_content)?;
        Ok(FlagAnalysis {
            flag_index,
            classification: fields.classification,
            confidence: clamp_confidence(fields.confidence),
            reasoning: fields.reasoning,
            cached: false,
        })
    }
}

impl SecurityAgent for LlmSecurityAgent {
    fn analyze(&self, content: &str, scan_result: &ScanResult) -> AgentOutcome {
        if scan_result.flags.is_empty() {
            return AgentOutcome::no_flags();
        }

        if !self.config.enabled {
            let analyses: Vec<FlagAnalysis> = scan_result
                .flags
                .iter()
                .enumerate()
                .map(|(flag_index, flag)| FlagAnalysis {
                    flag_index,
                    classification: flag.classification,
                    confidence: flag.confidence,
                    reasoning: DISABLED_REASONING.to_string(),
                    cached: false,
                })
                .collect();
            return AgentOutcome { analyses, overall: Classification::Public, agent_used: false }
                .with_recomputed_overall();
        }

        let analyses: Vec<FlagAnalysis> = scan_result
            .flags
            .iter()
            .enumerate()
            .map(|(flag_index, flag)| self.analyze_one_flag(content, flag_index, flag))
            .collect();

        AgentOutcome { analyses, overall: Classification::Public, agent_used: true }.with_recomputed_overall()
    }

    fn test_connection(&self) -> Result<u64, AgentError> {
        let started = Instant::now();
        let response = self
            .client
            .get(format!("{}/api/tags", self.config.base_url))
            .send()
            .map_err(|err| AgentError::Unavailable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(AgentError::Unavailable(format!("model service returned status {}", response.status())));
        }
        Ok(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX))
    }
}

fn fallback_analysis(flag_index: usize, classification: Classification) -> FlagAnalysis {
    FlagAnalysis { flag_index, classification, confidence: FALLBACK_CONFIDENCE, reasoning: FALLBACK_REASONING.to_string(), cached: false }
}

fn truncate_content(content: &str, max_len: usize) -> String {
    if content.len() <= max_len {
        return content.to_string();
    }
    let boundary = (0..=max_len).rev().find(|&idx| content.is_char_boundary(idx)).unwrap_or(0);
    content[..boundary].to_string()
}
