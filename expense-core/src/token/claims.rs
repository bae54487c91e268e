//! Read-only view of the access token's claims.
//!
//! Tokens are treated as opaque bearer strings. The only thing the client ever
//! looks at is the `exp` claim of the JWT payload; the signature is not
//! verified (the server does that on every request).

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

use crate::error::ExplorerError;

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: Option<f64>,
}

/// Decodes the `exp` claim (seconds since the epoch) of a JWT.
///
/// Returns `Ok(None)` for a well-formed token without an `exp` claim.
///
/// # Errors
///
/// Returns an error if the token does not have three segments or its payload
/// is not base64url-encoded JSON.
pub fn expiry_seconds(token: &str) -> Result<Option<f64>, ExplorerError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
        _ => {
            return Err(ExplorerError::InvalidInput {
                error: "token is not a three-segment JWT".to_string(),
            })
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ExplorerError::serialization("invalid JWT payload encoding", e))?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes)
        .map_err(|e| ExplorerError::serialization("invalid JWT payload", e))?;
    Ok(claim.exp)
}

/// Whether `token` is unexpired at `now`: `exp * 1000 > now_ms`.
///
/// Any decode failure, or a missing `exp`, yields `false`.
#[must_use]
pub fn is_unexpired_at(token: &str, now: SystemTime) -> bool {
    let now_ms = now
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64() * 1000.0);

    match expiry_seconds(token) {
        Ok(Some(exp)) => exp * 1000.0 > now_ms,
        Ok(None) => false,
        Err(e) => {
            log::debug!("treating undecodable access token as expired: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn token_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_expiry_seconds() {
        let token = token_with_payload(r#"{"exp":1700000000,"user_id":4}"#);
        assert_eq!(expiry_seconds(&token).unwrap(), Some(1_700_000_000.0));

        let no_exp = token_with_payload(r#"{"user_id":4}"#);
        assert_eq!(expiry_seconds(&no_exp).unwrap(), None);
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":1}"#);
        let token = format!("h.{payload}.s");
        assert_eq!(expiry_seconds(&token).unwrap(), Some(1.0));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(expiry_seconds("A1").is_err());
        assert!(expiry_seconds("a.b").is_err());
        assert!(expiry_seconds("a..c").is_err());
        assert!(expiry_seconds("a.!!!.c").is_err());
        assert!(expiry_seconds(&format!("a.{}.c", URL_SAFE_NO_PAD.encode("\"text\""))).is_err());
    }

    #[test]
    fn test_expiry_boundary_is_strict() {
        let token = token_with_payload(r#"{"exp":1000}"#);
        let at_expiry = UNIX_EPOCH + Duration::from_secs(1000);

        assert!(is_unexpired_at(&token, at_expiry - Duration::from_millis(1)));
        assert!(!is_unexpired_at(&token, at_expiry));
        assert!(!is_unexpired_at(&token, at_expiry + Duration::from_secs(1)));
    }
}
