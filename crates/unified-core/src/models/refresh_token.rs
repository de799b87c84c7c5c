// ABOUTME: Persisted refresh token record holding only the secret's hash
// ABOUTME: Revocation is stored; expiry is checked by the store when the token is consumed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single-use session-continuation credential
///
/// Revocation is terminal. Expiry is derived at read time from `expires_at`
/// and never written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Opaque identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: String,
    /// Owning user
    pub user_id: Uuid,
    /// Lowercase hex SHA-256 of the raw token
    pub token_hash: String,
    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
    /// Terminal revoked flag
    pub revoked: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}
