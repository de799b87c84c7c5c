// ABOUTME: Session credential issuance: short-lived HS256 access tokens and single-use refresh tokens
// ABOUTME: Rotates refresh tokens atomically so a presented token yields at most one new session
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Token Issuer
//!
//! Access tokens are stateless JWTs carrying the tenant identifier. Refresh
//! tokens are opaque random strings; only their SHA-256 digest is stored.
//! Refreshing consumes the presented token and issues a fresh pair in the
//! same transaction.

use crate::config::AuthConfig;
use crate::database::{self, Database};
use crate::errors::{AppError, AppResult};
use crate::tenant::TenantScope;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use unified_core::constants::auth::REFRESH_TOKEN_BYTES;
use unified_core::models::User;
use uuid::Uuid;

/// Claims carried by an access token
///
/// The claim set is closed: tokens carrying anything else are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessClaims {
    /// User id
    pub sub: String,
    /// User email at issuance
    pub email: String,
    /// Tenant the session belongs to
    pub app_id: String,
    /// Whether the account authenticates through Apple
    pub is_apple_user: bool,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

impl AccessClaims {
    /// Parse the subject as a user id
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` if the subject is not a UUID
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::auth_invalid("Invalid token subject"))
    }
}

/// Public view of the authenticated user returned with every session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// User id
    pub id: Uuid,
    /// User email
    pub email: String,
    /// Whether the account authenticates through Apple
    pub is_apple_user: bool,
}

/// Access + refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPair {
    /// Signed access token
    pub access_token: String,
    /// Raw refresh token; shown to the client once and never stored
    pub refresh_token: String,
    /// The session's user
    pub user: SessionUser,
}

/// Issues, validates, rotates, and revokes session credentials
#[derive(Clone)]
pub struct TokenIssuer {
    database: Database,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer signing with the configured secret
    #[must_use]
    pub fn new(database: Database, config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            database,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        }
    }

    /// Issue a new session pair for `user` in the scoped tenant
    ///
    /// # Errors
    ///
    /// Returns an error if signing or persisting the refresh token fails
    pub async fn issue_pair(&self, scope: &TenantScope, user: &User) -> AppResult<SessionPair> {
        let mut conn = self.database.pool().acquire().await?;
        self.issue_pair_with(&mut conn, scope, user).await
    }

    /// Issue a pair on an existing connection, typically inside a transaction
    pub(crate) async fn issue_pair_with(
        &self,
        conn: &mut SqliteConnection,
        scope: &TenantScope,
        user: &User,
    ) -> AppResult<SessionPair> {
        let access_token = self.sign_access_token(scope, user)?;

        let refresh_token = generate_refresh_token();
        let expires_at = Utc::now() + self.refresh_ttl;
        database::insert_refresh_token(
            conn,
            scope,
            user.id,
            &hash_refresh_token(&refresh_token),
            expires_at,
        )
        .await?;

        debug!(tenant_id = %scope, user_id = %user.id, "Issued session pair");

        Ok(SessionPair {
            access_token,
            refresh_token,
            user: SessionUser {
                id: user.id,
                email: user.email.clone(),
                is_apple_user: user.is_apple_user(),
            },
        })
    }

    /// Exchange a refresh token for a new pair, consuming it
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token is unknown, revoked, expired,
    /// belongs to another tenant, or its user no longer exists
    pub async fn refresh(&self, scope: &TenantScope, raw_token: &str) -> AppResult<SessionPair> {
        let token_hash = hash_refresh_token(raw_token);
        let mut tx = self.database.begin().await?;

        let Some(record) =
            database::consume_refresh_token(tx.executor()?, scope, &token_hash, Utc::now())
                .await?
        else {
            warn!(tenant_id = %scope, "Refresh rejected: token not active");
            return Err(AppError::invalid_token());
        };

        let Some(user) = database::find_user_by_id(tx.executor()?, scope, record.user_id).await?
        else {
            warn!(tenant_id = %scope, user_id = %record.user_id, "Refresh rejected: user missing");
            return Err(AppError::invalid_token());
        };

        let pair = self.issue_pair_with(tx.executor()?, scope, &user).await?;
        tx.commit().await?;

        info!(tenant_id = %scope, user_id = %user.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Revoke a refresh token; unknown tokens are silently accepted
    ///
    /// # Errors
    ///
    /// Returns an error only if the database update fails
    pub async fn revoke(&self, scope: &TenantScope, raw_token: &str) -> AppResult<()> {
        let revoked = self
            .database
            .revoke_refresh_token(scope, &hash_refresh_token(raw_token))
            .await?;
        debug!(tenant_id = %scope, revoked, "Logout processed");
        Ok(())
    }

    /// Validate an access token's signature, expiry, algorithm, and claim shape
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` for any token that is not a live token signed by this issuer
    pub fn validate_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "expired",
                    ErrorKind::InvalidSignature => "bad signature",
                    ErrorKind::InvalidAlgorithm => "wrong algorithm",
                    _ => "malformed",
                };
                debug!(reason, "Access token rejected");
                AppError::auth_invalid("Invalid or expired access token")
            })
    }

    fn sign_access_token(&self, scope: &TenantScope, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            app_id: scope.tenant_id().to_owned(),
            is_apple_user: user.is_apple_user(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign access token: {e}")))
    }
}

/// Fresh refresh token: 32 bytes from the OS RNG, URL-safe base64
fn generate_refresh_token() -> String {
    let mut bytes = [0_u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}

/// Lowercase hex SHA-256 of a raw refresh token
#[must_use]
pub fn hash_refresh_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_tokens_are_unique_and_url_safe() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 44);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '='));
    }

    #[test]
    fn test_hash_is_lowercase_hex_sha256() {
        let hash = hash_refresh_token("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_claims_reject_unknown_fields() {
        let json = r#"{"sub":"s","email":"e","app_id":"a","is_apple_user":false,"iat":1,"exp":2,"role":"admin"}"#;
        assert!(serde_json::from_str::<AccessClaims>(json).is_err());
    }
}
