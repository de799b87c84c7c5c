// ABOUTME: User principal model scoped to exactly one tenant
// ABOUTME: Defines authentication-provider and role tags with their storage encodings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// How the account authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    /// Email + password
    #[default]
    Password,
    /// Sign in with Apple
    Apple,
}

impl AuthProvider {
    /// Storage/tag representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Apple => "apple",
        }
    }
}

impl Display for AuthProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // "email" is the tag older rows were written with
            "password" | "email" => Ok(Self::Password),
            "apple" => Ok(Self::Apple),
            other => Err(format!("unknown auth provider: {other}")),
        }
    }
}

/// Coarse authorization role within a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular user
    #[default]
    User,
    /// Tenant administrator
    Admin,
}

impl UserRole {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Check if role grants admin endpoints
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// One principal within exactly one tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: String,
    /// Email, unique within the tenant
    pub email: String,
    /// bcrypt hash; empty for accounts created through Apple
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Apple subject identifier, once linked
    pub apple_sub: Option<String>,
    /// Authentication provider tag
    pub auth_provider: AuthProvider,
    /// Role tag
    pub role: UserRole,
    /// Display name supplied at first Apple sign-in
    pub display_name: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a password-authenticated user
    #[must_use]
    pub fn new_password_user(tenant_id: &str, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_owned(),
            email,
            password_hash,
            apple_sub: None,
            auth_provider: AuthProvider::Password,
            role: UserRole::User,
            display_name: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Create an Apple-authenticated user with no password
    #[must_use]
    pub fn new_apple_user(
        tenant_id: &str,
        email: String,
        apple_sub: String,
        display_name: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_owned(),
            email,
            password_hash: String::new(),
            apple_sub: Some(apple_sub),
            auth_provider: AuthProvider::Apple,
            role: UserRole::User,
            display_name,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether the account authenticates through Apple
    #[must_use]
    pub const fn is_apple_user(&self) -> bool {
        matches!(self.auth_provider, AuthProvider::Apple)
    }

    /// Whether a password login is possible at all
    #[must_use]
    pub fn has_password(&self) -> bool {
        !self.password_hash.is_empty()
    }
}
