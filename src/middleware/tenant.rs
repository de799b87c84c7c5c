// ABOUTME: Tower middleware resolving the tenant of every non-exempt request
// ABOUTME: Binds TenantScope (and the verified Principal, if any) into request extensions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Tenant Scope Middleware
//!
//! Resolution order:
//! 1. The `app_id` claim of a valid bearer access token
//! 2. The `X-App-ID` header, which must name a registered tenant
//! 3. The `app_id` query parameter, same validation
//!
//! An invalid bearer token does not fail here; protected routes reject it
//! through the [`Principal`] extractor.

use super::auth::{bearer_token, Principal};
use crate::errors::AppError;
use crate::logging::record_tenant_context;
use crate::resources::ServerResources;
use crate::tenant::TenantScope;
use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::Uri;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use unified_core::constants::headers::{APP_ID_QUERY_PARAM, X_APP_ID};
use unified_core::constants::routes::TENANT_EXEMPT_PREFIXES;

/// Resolve the tenant, bind it to the request, and tag the request span
pub async fn tenant_scope_middleware(
    State(resources): State<Arc<ServerResources>>,
    mut req: Request,
    next: Next,
) -> Response {
    if is_exempt(req.uri().path()) {
        return next.run(req).await;
    }

    let principal = bearer_token(req.headers()).and_then(|token| {
        resources
            .tokens
            .validate_access_token(token)
            .map_err(|e| debug!(error = %e, "Ignoring invalid bearer token for tenant resolution"))
            .ok()
    });

    let scope = match principal
        .as_ref()
        .and_then(|claims| resources.registry.scope(&claims.app_id))
    {
        Some(scope) => scope,
        None => match resolve_from_request(&resources, &req) {
            Ok(scope) => scope,
            Err(e) => return e.into_response(),
        },
    };

    record_tenant_context(scope.tenant_id());

    if let Some(claims) = principal.filter(|claims| claims.app_id == scope.tenant_id()) {
        req.extensions_mut().insert(Principal(claims));
    }
    req.extensions_mut().insert(scope);

    next.run(req).await
}

fn resolve_from_request(
    resources: &ServerResources,
    req: &Request,
) -> Result<TenantScope, AppError> {
    if let Some(app_id) = req
        .headers()
        .get(X_APP_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return resources
            .registry
            .scope(app_id)
            .ok_or_else(|| AppError::tenant_required(format!("Invalid X-App-ID: {app_id}")));
    }

    if let Some(app_id) = app_id_from_query(req.uri()) {
        return resources
            .registry
            .scope(&app_id)
            .ok_or_else(|| AppError::tenant_required(format!("Invalid app_id: {app_id}")));
    }

    Err(AppError::tenant_required("X-App-ID header is required"))
}

/// Whether `path` skips tenant resolution
#[must_use]
pub fn is_exempt(path: &str) -> bool {
    TENANT_EXEMPT_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Non-empty `app_id` query parameter, percent-decoded
#[must_use]
pub fn app_id_from_query(uri: &Uri) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params
        .get(APP_ID_QUERY_PARAM)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exempt_prefixes() {
        assert!(is_exempt("/api/health"));
        assert!(is_exempt("/api/legal/privacy"));
        assert!(is_exempt("/api/webhooks/revenuecat"));
        assert!(!is_exempt("/api/auth/login"));
        assert!(!is_exempt("/api/legal"));
    }

    #[test]
    fn test_app_id_from_query() {
        let uri = |s: &str| s.parse::<Uri>().unwrap();
        assert_eq!(
            app_id_from_query(&uri("/api/config?app_id=app-a")),
            Some("app-a".to_owned())
        );
        assert_eq!(
            app_id_from_query(&uri("/api/config?x=1&app_id=my%20app")),
            Some("my app".to_owned())
        );
        assert_eq!(app_id_from_query(&uri("/api/config?app_id=")), None);
        assert_eq!(app_id_from_query(&uri("/api/config")), None);
    }
}
