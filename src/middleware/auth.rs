// ABOUTME: Bearer access token authentication for protected routes
// ABOUTME: Provides the Principal extractor and a guard middleware that rejects anonymous requests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::auth::AccessClaims;
use crate::errors::{AppError, AppResult};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    middleware::Next,
    response::Response,
};
use http::header::AUTHORIZATION;
use http::request::Parts;
use http::HeaderMap;
use uuid::Uuid;

/// Verified access token claims of the caller
///
/// Bound by the tenant middleware only when the bearer token is valid and
/// belongs to the resolved tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub AccessClaims);

impl Principal {
    /// Authenticated user id
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` if the subject is not a UUID
    pub fn user_id(&self) -> AppResult<Uuid> {
        self.0.user_id()
    }

    /// Email carried by the token
    #[must_use]
    pub fn email(&self) -> &str {
        &self.0.email
    }

    /// Underlying claims
    #[must_use]
    pub const fn claims(&self) -> &AccessClaims {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        principal_from_parts(&parts.extensions, &parts.headers)
    }
}

/// Optional variant for routes that accept both anonymous and authenticated callers
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Principal>().cloned()))
    }
}

/// Reject requests that carry no valid access token for the resolved tenant
pub async fn require_principal(req: Request, next: Next) -> Result<Response, AppError> {
    principal_from_parts(req.extensions(), req.headers())?;
    Ok(next.run(req).await)
}

fn principal_from_parts(
    extensions: &http::Extensions,
    headers: &HeaderMap,
) -> Result<Principal, AppError> {
    if let Some(principal) = extensions.get::<Principal>() {
        return Ok(principal.clone());
    }
    if bearer_token(headers).is_some() {
        Err(AppError::auth_invalid("Invalid or expired access token"))
    } else {
        Err(AppError::auth_required())
    }
}

/// Token from an `Authorization: Bearer <token>` header
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
