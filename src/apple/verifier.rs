// ABOUTME: RS256 identity token verification against Apple's signing keys
// ABOUTME: Checks structure, algorithm, issuer, audience, and expiry before the RSA signature
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{AppleKeyStore, AppleVerificationError};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;
use unified_core::constants::apple::{ISSUER, SIGNING_ALGORITHM};

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
    kid: Option<String>,
}

/// Claims of a verified Apple identity token
///
/// Unrecognized claims are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct AppleClaims {
    /// Issuer, always `https://appleid.apple.com` once verified
    pub iss: String,
    /// Audience, the app's bundle identifier
    pub aud: String,
    /// Stable Apple user identifier
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
    /// Email, possibly a private relay address
    #[serde(default)]
    pub email: Option<String>,
    /// Apple sends this as a bool or as the string "true"/"false"
    #[serde(default)]
    pub email_verified: Option<Value>,
    /// Whether `email` is a private relay address
    #[serde(default)]
    pub is_private_email: Option<Value>,
    /// Nonce echoed from the authorization request
    #[serde(default)]
    pub nonce: Option<String>,
}

impl AppleClaims {
    /// Email from the token unless Apple explicitly marks it unverified
    #[must_use]
    pub fn usable_email(&self) -> Option<&str> {
        let email = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())?;
        let explicitly_unverified = match &self.email_verified {
            Some(Value::Bool(verified)) => !verified,
            Some(Value::String(verified)) => verified.eq_ignore_ascii_case("false"),
            _ => false,
        };
        (!explicitly_unverified).then_some(email)
    }
}

/// Verifies Apple identity tokens
pub struct AppleIdentityVerifier {
    keys: AppleKeyStore,
}

impl AppleIdentityVerifier {
    /// Create a verifier backed by `keys`
    #[must_use]
    pub const fn new(keys: AppleKeyStore) -> Self {
        Self { keys }
    }

    /// Verify `raw` and return its claims
    ///
    /// # Errors
    ///
    /// Returns the first failing check; claim checks run before the key lookup
    pub async fn verify(
        &self,
        raw: &str,
        expected_audience: &str,
    ) -> Result<AppleClaims, AppleVerificationError> {
        let parts: Vec<&str> = raw.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = parts.as_slice() else {
            return Err(AppleVerificationError::Malformed(format!(
                "expected 3 segments, found {}",
                parts.len()
            )));
        };

        let header: JwtHeader = decode_segment(header_b64, "header")?;
        if header.alg != SIGNING_ALGORITHM {
            return Err(AppleVerificationError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| AppleVerificationError::Malformed("missing kid".to_owned()))?;

        let claims: AppleClaims = decode_segment(payload_b64, "payload")?;
        check_claims(&claims, expected_audience, Utc::now().timestamp())?;

        let key = self.keys.key(&kid).await?;

        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64.trim_end_matches('='))
            .map_err(|_| AppleVerificationError::Malformed("signature encoding".to_owned()))?;
        let signature = Signature::try_from(signature_bytes.as_slice())
            .map_err(|_| AppleVerificationError::InvalidSignature)?;

        let signing_input = format!("{header_b64}.{payload_b64}");
        VerifyingKey::<Sha256>::new(key)
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| AppleVerificationError::InvalidSignature)?;

        debug!(kid = %kid, "Apple identity token verified");
        Ok(claims)
    }
}

fn decode_segment<T: DeserializeOwned>(
    segment: &str,
    name: &str,
) -> Result<T, AppleVerificationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| AppleVerificationError::Malformed(format!("{name} encoding: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppleVerificationError::Malformed(format!("{name} json: {e}")))
}

fn check_claims(
    claims: &AppleClaims,
    expected_audience: &str,
    now: i64,
) -> Result<(), AppleVerificationError> {
    if claims.iss != ISSUER {
        return Err(AppleVerificationError::InvalidIssuer(claims.iss.clone()));
    }
    if claims.aud != expected_audience {
        return Err(AppleVerificationError::InvalidAudience(claims.aud.clone()));
    }
    if claims.exp <= now {
        return Err(AppleVerificationError::Expired);
    }
    if claims.sub.is_empty() {
        return Err(AppleVerificationError::Malformed("empty sub".to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> AppleClaims {
        serde_json::from_value(value).unwrap()
    }

    fn base() -> Value {
        json!({
            "iss": ISSUER,
            "aud": "com.example.app",
            "sub": "001.abc",
            "iat": 1_000,
            "exp": 2_000,
            "email": "a@example.com",
            "extra": "ignored"
        })
    }

    #[test]
    fn test_check_claims_order() {
        assert!(check_claims(&claims(base()), "com.example.app", 1_500).is_ok());

        let mut wrong_iss = base();
        wrong_iss["iss"] = json!("https://evil.example");
        assert!(matches!(
            check_claims(&claims(wrong_iss), "com.example.app", 1_500),
            Err(AppleVerificationError::InvalidIssuer(_))
        ));

        assert!(matches!(
            check_claims(&claims(base()), "com.other.app", 1_500),
            Err(AppleVerificationError::InvalidAudience(_))
        ));

        assert_eq!(
            check_claims(&claims(base()), "com.example.app", 2_000),
            Err(AppleVerificationError::Expired)
        );
    }

    #[test]
    fn test_usable_email_respects_verification_flag() {
        assert_eq!(claims(base()).usable_email(), Some("a@example.com"));

        let mut unverified = base();
        unverified["email_verified"] = json!("false");
        assert_eq!(claims(unverified).usable_email(), None);

        let mut verified = base();
        verified["email_verified"] = json!(true);
        assert_eq!(claims(verified).usable_email(), Some("a@example.com"));

        let mut missing = base();
        missing["email"] = Value::Null;
        assert_eq!(claims(missing).usable_email(), None);
    }
}
