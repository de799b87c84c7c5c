// ABOUTME: Apple identity assertion verification and Apple sign-in account upsert
// ABOUTME: Verifies RS256 identity tokens against Apple's published keys before trusting any claim
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Sign in with Apple
//!
//! - [`AppleKeyStore`]: cached Apple signing keys, refetched on expiry or key miss
//! - [`AppleIdentityVerifier`]: structural, claim, and signature checks
//! - [`AppleSignIn`]: maps a verified assertion onto a tenant account and issues a session

/// Apple JWKS cache
pub mod jwks;
/// Apple sign-in account upsert
pub mod sign_in;
/// Identity token verification
pub mod verifier;

pub use jwks::AppleKeyStore;
pub use sign_in::AppleSignIn;
pub use verifier::{AppleClaims, AppleIdentityVerifier};

use crate::errors::AppError;
use thiserror::Error;

/// Reasons an Apple identity token is rejected
///
/// Logged server-side only; clients always see the same generic failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppleVerificationError {
    /// Token is not a well-formed three-segment JWT
    #[error("malformed identity token: {0}")]
    Malformed(String),
    /// Header names an algorithm other than RS256
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// No Apple key matches the header's key id
    #[error("unknown signing key id: {0}")]
    UnknownKey(String),
    /// Apple's key set could not be retrieved
    #[error("failed to fetch Apple public keys: {0}")]
    KeyFetch(String),
    /// `iss` is not Apple
    #[error("invalid issuer: {0}")]
    InvalidIssuer(String),
    /// `aud` does not match the tenant's bundle identifier
    #[error("invalid audience: {0}")]
    InvalidAudience(String),
    /// `exp` is in the past
    #[error("identity token expired")]
    Expired,
    /// RSA signature does not verify
    #[error("invalid signature")]
    InvalidSignature,
}

impl From<AppleVerificationError> for AppError {
    fn from(_: AppleVerificationError) -> Self {
        Self::verification_failed()
    }
}
