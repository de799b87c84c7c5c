// ABOUTME: Authentication module for tenant-scoped password accounts and session tokens
// ABOUTME: Re-exports the password authenticator and the token issuer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Authentication and Session Management
//!
//! - [`PasswordAuthenticator`]: register, login, delete account
//! - [`TokenIssuer`]: access/refresh pairs, rotation, revocation, validation

/// Email + password account lifecycle
pub mod password;
/// Access and refresh token handling
pub mod tokens;

pub use password::{normalize_email, validate_email, PasswordAuthenticator};
pub use tokens::{hash_refresh_token, AccessClaims, SessionPair, SessionUser, TokenIssuer};
