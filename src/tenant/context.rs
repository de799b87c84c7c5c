// ABOUTME: Request-scoped tenant handle minted only by the tenant registry
// ABOUTME: Implements the axum extractor that reads the scope bound by the tenant middleware
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::AppError;
use axum::{async_trait, extract::FromRequestParts};
use http::request::Parts;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

/// Proof that a request resolved to a registered tenant
///
/// Cloning is cheap. There is no public constructor: scopes come from
/// [`TenantRegistry::scope`](super::TenantRegistry::scope).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantScope {
    tenant_id: Arc<str>,
}

impl TenantScope {
    pub(super) fn new(tenant_id: &str) -> Self {
        Self {
            tenant_id: Arc::from(tenant_id),
        }
    }

    /// Identifier of the resolved tenant
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl Display for TenantScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.tenant_id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::tenant_required("X-App-ID header is required"))
    }
}
