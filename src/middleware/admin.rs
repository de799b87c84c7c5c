// ABOUTME: Admin authorization for /api/admin routes
// ABOUTME: Grants via static admin token, configured allow-lists, or the admin role within the tenant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Admin Authorization Guard
//!
//! Any one of the following grants access, checked in order:
//! 1. `X-Admin-Token` equal to the configured admin token
//! 2. Principal email in `ADMIN_EMAILS` or subject in `ADMIN_USER_IDS`
//! 3. Principal's user record in the resolved tenant has the admin role
//!
//! Everything else, including an anonymous request, is denied with 403.

use super::auth::MaybePrincipal;
use crate::auth::AccessClaims;
use crate::config::AdminConfig;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::logging::TenantLogger;
use crate::resources::ServerResources;
use crate::tenant::TenantScope;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::debug;
use unified_core::constants::headers::X_ADMIN_TOKEN;

const ADMIN_REQUIRED: &str = "Admin access required";

/// How an admin request was authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminGrant {
    /// Matching `X-Admin-Token`
    StaticToken,
    /// Principal listed in `ADMIN_EMAILS` or `ADMIN_USER_IDS`
    AllowList,
    /// Principal holds the admin role in the resolved tenant
    Role,
}

/// Decides whether a request may use admin routes
#[derive(Clone)]
pub struct AdminAuthorizer {
    config: Arc<AdminConfig>,
    database: Database,
}

impl AdminAuthorizer {
    /// Create an authorizer
    #[must_use]
    pub fn new(config: AdminConfig, database: Database) -> Self {
        Self {
            config: Arc::new(config),
            database,
        }
    }

    /// Authorize a request
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` ("Admin access required") unless a grant applies,
    /// or a database error from the role lookup
    pub async fn authorize(
        &self,
        scope: &TenantScope,
        principal: Option<&AccessClaims>,
        admin_token: Option<&str>,
    ) -> AppResult<AdminGrant> {
        if let (Some(expected), Some(presented)) = (self.config.token.as_deref(), admin_token) {
            if !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(presented.as_bytes()))
            {
                return Ok(AdminGrant::StaticToken);
            }
        }

        let Some(claims) = principal else {
            return Err(deny(scope, "no principal"));
        };

        let email = claims.email.to_lowercase();
        if self.config.emails.iter().any(|allowed| *allowed == email)
            || self.config.user_ids.iter().any(|allowed| *allowed == claims.sub)
        {
            return Ok(AdminGrant::AllowList);
        }

        let user_id = claims.user_id()?;
        let is_admin = self
            .database
            .get_user_by_id(scope, user_id)
            .await?
            .is_some_and(|user| user.role.is_admin());
        if is_admin {
            return Ok(AdminGrant::Role);
        }

        Err(deny(scope, "principal lacks admin role"))
    }
}

fn deny(scope: &TenantScope, reason: &str) -> AppError {
    TenantLogger::log_security_event(Some(scope.tenant_id()), "admin_denied", reason);
    AppError::permission_denied(ADMIN_REQUIRED)
}

/// Reject requests that are not admin-authorized; binds the [`AdminGrant`]
pub async fn require_admin(
    State(resources): State<Arc<ServerResources>>,
    scope: TenantScope,
    MaybePrincipal(principal): MaybePrincipal,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let admin_token = req
        .headers()
        .get(X_ADMIN_TOKEN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let grant = resources
        .admin
        .authorize(
            &scope,
            principal.as_ref().map(|p| p.claims()),
            admin_token.as_deref(),
        )
        .await?;

    debug!(tenant_id = %scope, grant = ?grant, "Admin request authorized");
    req.extensions_mut().insert(grant);
    Ok(next.run(req).await)
}
