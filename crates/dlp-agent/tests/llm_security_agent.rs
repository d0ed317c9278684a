// crates/dlp-agent/tests/llm_security_agent.rs
// ============================================================================
// Module: LLM Security Agent Integration Tests
// Description: End-to-end coverage of analyze() and test_connection() against a mock LM server.
// Purpose: Exercise the disabled/no-flag passthroughs, cache hits, and fail-closed fallback.
// Dependencies: dlp-core, dlp-agent, tiny_http
// ============================================================================

//! Integration tests for the LLM security agent.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::thread;

use dlp_agent::LlmAgentConfig;
use dlp_agent::LlmSecurityAgent;
use dlp_core::Classification;
use dlp_core::Flag;
use dlp_core::FlagSource;
use dlp_core::ScanId;
use dlp_core::ScanResult;
use dlp_core::SecurityAgent;
use dlp_core::Timestamp;
use tiny_http::Response;
use tiny_http::Server;

fn sample_flag() -> Flag {
    Flag {
        start_index: 0,
        end_index: 11,
        label: "ssn".to_string(),
        matched_text: "123-45-6789".to_string(),
        context: "[123-45-6789]".to_string(),
        classification: Classification::NeverShare,
        confidence: 1.0,
        source: FlagSource::Pattern,
    }
}

fn flagged_result(flags: Vec<Flag>) -> ScanResult {
    ScanResult::flagged(ScanId::new("scan-1"), Timestamp::now(), 32, 5, flags)
}

#[test]
fn no_flags_returns_public_without_calling_the_model() {
    let config = LlmAgentConfig { base_url: "http://127.0.0.1:1".to_string(), ..LlmAgentConfig::default() };
    let agent = LlmSecurityAgent::new(config).expect("agent");
    let result = ScanResult::clean(ScanId::new("scan-0"), Timestamp::now(), 0, 0);
    let outcome = agent.analyze("", &result);
    assert!(outcome.analyses.is_empty());
    assert_eq!(outcome.overall, Classification::Public);
    assert!(!outcome.agent_used);
}

#[test]
fn disabled_agent_passes_through_scanner_classification() {
    let config = LlmAgentConfig { enabled: false, base_url: "http://127.0.0.1:1".to_string(), ..LlmAgentConfig::default() };
    let agent = LlmSecurityAgent::new(config).expect("agent");
    let result = flagged_result(vec![sample_flag()]);
    let outcome = agent.analyze("my ssn is 123-45-6789", &result);
    assert_eq!(outcome.analyses.len(), 1);
    assert_eq!(outcome.analyses[0].classification, Classification::NeverShare);
    assert_eq!(outcome.analyses[0].reasoning, "agent disabled");
    assert!(!outcome.agent_used);
}

#[test]
fn unreachable_model_falls_back_to_scanner_classification() {
    let config = LlmAgentConfig { base_url: "http://127.0.0.1:1".to_string(), timeout_ms: 500, ..LlmAgentConfig::default() };
    let agent = LlmSecurityAgent::new(config).expect("agent");
    let result = flagged_result(vec![sample_flag()]);
    let outcome = agent.analyze("my ssn is 123-45-6789", &result);
    assert_eq!(outcome.analyses.len(), 1);
    assert_eq!(outcome.analyses[0].classification, Classification::NeverShare);
    assert_eq!(outcome.analyses[0].reasoning, "LLM analysis failed / using scanner classification");
    assert!((outcome.analyses[0].confidence - 0.5).abs() < f64::EPSILON);
    assert!(outcome.agent_used);
}

#[test]
fn successful_model_call_reclassifies_the_flag() {
    let server = Server::http("127.0.0.1:0").expect("bind");
    let addr = server.server_addr().to_ip().expect("ip");
    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let body = r#"{"choices":[{"message":{"content":"{\"classification\": \"public\", \"confidence\": 0.1, \"reasoning\": \"looks like a placeholder\"}"}}]}"#;
            let response = Response::from_string(body)
                .with_header(tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).expect("header"));
            let _ = request.respond(response);
        }
    });

    let config = LlmAgentConfig { base_url: format!("http://{addr}"), timeout_ms: 5_000, ..LlmAgentConfig::default() };
    let agent = LlmSecurityAgent::new(config).expect("agent");
    let result = flagged_result(vec![sample_flag()]);
    let outcome = agent.analyze("example ssn 123-45-6789 in docs", &result);
    handle.join().expect("server thread");

    assert_eq!(outcome.analyses.len(), 1);
    assert_eq!(outcome.analyses[0].classification, Classification::Public);
    assert!(!outcome.analyses[0].cached);
    assert_eq!(outcome.overall, Classification::Public);
}

#[test]
fn second_call_with_identical_flag_and_content_is_served_from_cache() {
    let server = Server::http("127.0.0.1:0").expect("bind");
    let addr = server.server_addr().to_ip().expect("ip");
    let handle = thread::spawn(move || {
        for _ in 0..1u8 {
            if let Ok(request) = server.recv() {
                let body = r#"{"choices":[{"message":{"content":"{\"classification\": \"internal_only\", \"confidence\": 0.7, \"reasoning\": \"internal use\"}"}}]}"#;
                let _ = request.respond(Response::from_string(body));
            }
        }
    });

    let config = LlmAgentConfig { base_url: format!("http://{addr}"), timeout_ms: 5_000, cache_ttl_ms: 60_000, ..LlmAgentConfig::default() };
    let agent = LlmSecurityAgent::new(config).expect("agent");
    let content = "my ssn is 123-45-6789";
    let result = flagged_result(vec![sample_flag()]);

    let first = agent.analyze(content, &result);
    let second = agent.analyze(content, &result);
    handle.join().expect("server thread");

    assert!(!first.analyses[0].cached);
    assert!(second.analyses[0].cached);
    assert_eq!(second.analyses[0].classification, Classification::InternalOnly);
}

#[test]
fn test_connection_reports_latency_on_success() {
    let server = Server::http("127.0.0.1:0").expect("bind");
    let addr = server.server_addr().to_ip().expect("ip");
    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let _ = request.respond(Response::from_string(r#"{"models":[]}"#));
        }
    });

    let config = LlmAgentConfig { base_url: format!("http://{addr}"), timeout_ms: 5_000, ..LlmAgentConfig::default() };
    let agent = LlmSecurityAgent::new(config).expect("agent");
    let latency = agent.test_connection();
    handle.join().expect("server thread");
    assert!(latency.is_ok());
}

#[test]
fn test_connection_fails_closed_when_unreachable() {
    let config = LlmAgentConfig { base_url: "http://127.0.0.1:1".to_string(), timeout_ms: 500, ..LlmAgentConfig::default() };
    let agent = LlmSecurityAgent::new(config).expect("agent");
    assert!(agent.test_connection().is_err());
}
