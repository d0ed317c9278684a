// crates/dlp-hook/src/token.rs
// ============================================================================
// Module: Approval Token Minting
// Description: HMAC-SHA256 signed, base64-encoded approval tokens and content hashes.
// Purpose: Produce an opaque, externally-verifiable token for allowed outbound content.
// Dependencies: dlp-core, hmac, sha2, hex, base64, serde_jcs
// ============================================================================

//! ## Overview
//! A token is `base64(json_body + "|" + hex_signature_prefix_16)` where
//! `json_body` is the canonical JSON serialization of `{request_id,
//! timestamp_ms, classification}` and the signature is an HMAC-SHA256 over
//! that exact byte sequence, truncated to its first 16 hex characters.
//! Tokens are opaque to callers; the hook does not verify its own tokens
//! today, but the format is reproducible for external verification.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as Base64;
use dlp_core::Classification;
use dlp_core::RequestId;
use dlp_core::Timestamp;
use hmac::Hmac;
use hmac::Mac;
use serde::Serialize;
use sha2::Sha256;

use crate::HookError;

type HmacSha256 = Hmac<Sha256>;

/// Canonical fields signed into an approval token.
#[derive(Serialize)]
struct TokenBody {
    /// Originating request identifier.
    request_id: String,
    /// Minting time, Unix epoch milliseconds.
    timestamp_ms: i64,
    /// Classification the token attests to.
    classification: Classification,
}

/// Computes the hex-encoded HMAC-SHA256 of `data` under `key`.
pub(crate) fn hmac_hex(key: &[u8], data: &[u8]) -> Result<String, HookError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|err| HookError::Signing(err.to_string()))?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Mints a fresh approval token for `request_id` at the given classification.
pub(crate) fn mint_approval_token(
    key: &[u8],
    request_id: &RequestId,
    classification: Classification,
) -> Result<String, HookError> {
    let body = TokenBody {
        request_id: request_id.as_str().to_string(),
        timestamp_ms: Timestamp::now().as_unix_millis(),
        classification,
    };
    let json_body = serde_jcs::to_vec(&body).map_err(|err| HookError::Signing(err.to_string()))?;
    let signature = hmac_hex(key, &json_body)?;
    let prefix: String = signature.chars().take(16).collect();
    let mut payload = json_body;
    payload.push(b'|');
    payload.extend_from_slice(prefix.as_bytes());
    Ok(Base64.encode(payload))
}

#[cfg(test)]
mod tests {
    use super::mint_approval_token;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as Base64;
    use dlp_core::Classification;
    use dlp_core::RequestId;

    #[test]
    fn token_is_valid_base64() {
        let key = b"test-key";
        let request_id = RequestId::new("req-1");
        let Ok(token) = mint_approval_token(key, &request_id, Classification::Public) else {
            unreachable!("signing with a valid key must succeed")
        };
        assert!(!token.is_empty());
        assert!(Base64.decode(&token).is_ok());
    }

    #[test]
    fn decoded_payload_carries_a_16_character_signature_suffix() {
        let key = b"test-key";
        let request_id = RequestId::new("req-2");
        let Ok(token) = mint_approval_token(key, &request_id, Classification::NeverShare) else {
            unreachable!("signing with a valid key must succeed")
        };
        let Ok(decoded) = Base64.decode(&token) else { unreachable!("token must be valid base64") };
        let Ok(decoded_str) = String::from_utf8(decoded) else { unreachable!("decoded payload must be utf8") };
        let parts: Vec<&str> = decoded_str.rsplitn(2, '|').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 16);
    }

    #[test]
    fn different_keys_produce_different_signatures() {
        let request_id = RequestId::new("req-3");
        let Ok(first) = mint_approval_token(b"key-one", &request_id, Classification::Public) else {
            unreachable!("signing with a valid key must succeed")
        };
        let Ok(second) = mint_approval_token(b"key-two", &request_id, Classification::Public) else {
            unreachable!("signing with a valid key must succeed")
        };
        assert_ne!(first, second);
    }
}
