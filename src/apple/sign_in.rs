// ABOUTME: Apple sign-in: maps a verified Apple identity onto a tenant account
// ABOUTME: Finds by Apple subject, links by verified email, or creates a passwordless account
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{AppleClaims, AppleIdentityVerifier};
use crate::auth::{normalize_email, validate_email, SessionPair, TokenIssuer};
use crate::database::{self, Database};
use crate::errors::{AppError, AppResult};
use crate::logging::TenantLogger;
use crate::tenant::{TenantRegistry, TenantScope};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::info;
use unified_core::constants::apple::PLACEHOLDER_EMAIL_DOMAIN;
use unified_core::models::{AuthProvider, User};

/// Apple sign-in flow for every tenant
#[derive(Clone)]
pub struct AppleSignIn {
    registry: Arc<TenantRegistry>,
    verifier: Arc<AppleIdentityVerifier>,
    database: Database,
    tokens: Arc<TokenIssuer>,
}

impl AppleSignIn {
    /// Create the flow
    #[must_use]
    pub const fn new(
        registry: Arc<TenantRegistry>,
        verifier: Arc<AppleIdentityVerifier>,
        database: Database,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            registry,
            verifier,
            database,
            tokens,
        }
    }

    /// Verify an identity token for the scoped tenant and issue a session
    ///
    /// `email` and `full_name` are the client-supplied values Apple returns
    /// only on first authorization; they are used solely when creating an account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty token or a tenant without an Apple
    /// audience, `VerificationFailed` if the token is rejected, or a database error
    pub async fn sign_in(
        &self,
        scope: &TenantScope,
        identity_token: &str,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<SessionPair> {
        if identity_token.trim().is_empty() {
            return Err(AppError::invalid_input("identity_token is required"));
        }
        let audience = self
            .registry
            .identity_audience(scope.tenant_id())
            .ok_or_else(|| AppError::invalid_input("Apple Sign In not configured for this app"))?;

        let claims = match self.verifier.verify(identity_token, audience).await {
            Ok(claims) => claims,
            Err(e) => {
                TenantLogger::log_auth_event(
                    scope.tenant_id(),
                    None,
                    "apple",
                    false,
                    Some(&e.to_string()),
                );
                return Err(e.into());
            }
        };

        let mut tx = self.database.begin().await?;
        let user = upsert_apple_user(tx.executor()?, scope, &claims, full_name, email).await?;
        let pair = self.tokens.issue_pair_with(tx.executor()?, scope, &user).await?;
        tx.commit().await?;

        TenantLogger::log_auth_event(scope.tenant_id(), Some(user.id), "apple", true, None);
        Ok(pair)
    }
}

async fn upsert_apple_user(
    conn: &mut SqliteConnection,
    scope: &TenantScope,
    claims: &AppleClaims,
    full_name: Option<&str>,
    request_email: Option<&str>,
) -> AppResult<User> {
    if let Some(user) = database::find_user_by_apple_sub(conn, scope, &claims.sub).await? {
        return Ok(user);
    }

    let claim_email = claims.usable_email().map(normalize_email);

    if let Some(email) = &claim_email {
        if let Some(mut user) = database::find_user_by_email(conn, scope, email).await? {
            if user.apple_sub.is_none() {
                database::link_apple_sub(conn, scope, user.id, &claims.sub).await?;
                user.apple_sub = Some(claims.sub.clone());
                user.auth_provider = AuthProvider::Apple;
                info!(tenant_id = %scope, user_id = %user.id, "Linked Apple identity to existing account");
            }
            return Ok(user);
        }
    }

    let email = match claim_email {
        Some(email) => email,
        None => fallback_email(conn, scope, &claims.sub, request_email).await?,
    };
    let display_name = full_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned);

    let user = User::new_apple_user(scope.tenant_id(), email, claims.sub.clone(), display_name);
    database::insert_user(conn, scope, &user).await?;
    info!(tenant_id = %scope, user_id = %user.id, "Created Apple account");
    Ok(user)
}

/// Client-supplied email if valid and free in this tenant, else a per-subject placeholder
async fn fallback_email(
    conn: &mut SqliteConnection,
    scope: &TenantScope,
    apple_sub: &str,
    request_email: Option<&str>,
) -> AppResult<String> {
    if let Some(email) = request_email.map(normalize_email) {
        if validate_email(&email).is_ok()
            && database::find_user_by_email(conn, scope, &email).await?.is_none()
        {
            return Ok(email);
        }
    }
    Ok(placeholder_email(apple_sub))
}

fn placeholder_email(apple_sub: &str) -> String {
    format!("{}@{PLACEHOLDER_EMAIL_DOMAIN}", apple_sub.to_lowercase())
}
