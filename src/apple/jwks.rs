// ABOUTME: Apple signing key cache fetched from Apple's JWKS endpoint
// ABOUTME: Refetches on expiry or unknown key id and replaces the whole key map atomically
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::AppleVerificationError;
use crate::config::AppleConfig;
use crate::errors::{AppError, AppResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use rsa::{BigUint, RsaPublicKey};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Keys plus the instant they stop being trusted
struct CachedKeys {
    keys: HashMap<String, RsaPublicKey>,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
    kty: String,
    kid: String,
    n: String,
    e: String,
}

/// Process-wide cache of Apple's RSA signing keys, keyed by `kid`
///
/// Thread-safe via `Arc<RwLock<_>>`; readers never block each other.
#[derive(Clone)]
pub struct AppleKeyStore {
    http_client: Client,
    jwks_url: String,
    cache_ttl: Duration,
    cached_keys: Arc<RwLock<Option<CachedKeys>>>,
}

impl AppleKeyStore {
    /// Create a key store with a bounded-time HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: &AppleConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build JWKS HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            jwks_url: config.jwks_url.clone(),
            cache_ttl: Duration::from_std(config.key_cache_ttl)
                .unwrap_or_else(|_| Duration::hours(24)),
            cached_keys: Arc::new(RwLock::new(None)),
        })
    }

    /// Public key for `kid`, refetching once if the cache is stale or lacks it
    ///
    /// # Errors
    ///
    /// Returns `KeyFetch` if keys cannot be retrieved and `UnknownKey` if
    /// the fresh key set still lacks `kid`
    pub async fn key(&self, kid: &str) -> Result<RsaPublicKey, AppleVerificationError> {
        if let Some(key) = self.try_get_cached_key(kid).await {
            return Ok(key);
        }

        self.refresh_keys().await?;

        let cache = self.cached_keys.read().await;
        cache
            .as_ref()
            .and_then(|cached| cached.keys.get(kid).cloned())
            .ok_or_else(|| AppleVerificationError::UnknownKey(kid.to_owned()))
    }

    async fn try_get_cached_key(&self, kid: &str) -> Option<RsaPublicKey> {
        let cache = self.cached_keys.read().await;
        let key = cache.as_ref().and_then(|cached| {
            if cached.expires_at > Utc::now() {
                cached.keys.get(kid).cloned()
            } else {
                None
            }
        });
        if key.is_some() {
            debug!(kid = %kid, "Using cached Apple public key");
        }
        key
    }

    async fn refresh_keys(&self) -> Result<(), AppleVerificationError> {
        info!(url = %self.jwks_url, "Fetching Apple public keys");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AppleVerificationError::KeyFetch(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(AppleVerificationError::KeyFetch(format!(
                "JWKS endpoint returned status {}",
                response.status()
            )));
        }

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| AppleVerificationError::KeyFetch(format!("invalid JWKS body: {e}")))?;

        let keys = convert_jwks_to_keys(set);
        let expires_at = Utc::now() + self.cache_ttl;
        info!(num_keys = keys.len(), expires_at = %expires_at, "Apple public keys cached");

        let mut cache = self.cached_keys.write().await;
        *cache = Some(CachedKeys { keys, expires_at });
        Ok(())
    }
}

/// Convert JWKs into RSA keys, skipping entries that fail to parse
fn convert_jwks_to_keys(set: JwkSet) -> HashMap<String, RsaPublicKey> {
    let mut keys = HashMap::with_capacity(set.keys.len());
    for jwk in set.keys {
        match parse_rsa_jwk(&jwk) {
            Ok(key) => {
                keys.insert(jwk.kid, key);
            }
            Err(reason) => {
                warn!(kid = %jwk.kid, reason = %reason, "Skipping unusable Apple JWK");
            }
        }
    }
    keys
}

fn parse_rsa_jwk(jwk: &Jwk) -> Result<RsaPublicKey, String> {
    if jwk.kty != "RSA" {
        return Err(format!("unsupported key type {}", jwk.kty));
    }
    let n = URL_SAFE_NO_PAD
        .decode(jwk.n.trim_end_matches('='))
        .map_err(|e| format!("bad modulus: {e}"))?;
    let e = URL_SAFE_NO_PAD
        .decode(jwk.e.trim_end_matches('='))
        .map_err(|e| format!("bad exponent: {e}"))?;

    RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
        .map_err(|e| format!("invalid RSA key: {e}"))
}
