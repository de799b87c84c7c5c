// ABOUTME: Request and response types for authentication routes
// ABOUTME: Defines DTOs for registration, login, refresh, Apple sign-in, logout, and account deletion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Authentication request and response types

use serde::{Deserialize, Serialize};

/// Registration and login request
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    /// User's email address
    pub email: String,
    /// User's password
    pub password: String,
}

/// Refresh and logout request
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    /// Raw refresh token issued with the session
    pub refresh_token: String,
}

/// Apple sign-in request
#[derive(Debug, Deserialize)]
pub struct AppleSignInRequest {
    /// Identity token (JWT) from Apple
    pub identity_token: String,
    /// Authorization code; accepted but not exchanged
    #[serde(default)]
    pub authorization_code: Option<String>,
    /// Name Apple shares on first authorization only
    #[serde(default)]
    pub full_name: Option<String>,
    /// Email Apple shares on first authorization only
    #[serde(default)]
    pub email: Option<String>,
}

/// Account deletion request
#[derive(Debug, Default, Deserialize)]
pub struct DeleteAccountRequest {
    /// Current password; not required for Apple accounts
    #[serde(default)]
    pub password: Option<String>,
}

/// Plain confirmation body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable confirmation
    pub message: String,
}

impl MessageResponse {
    /// Build a confirmation
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
