// ABOUTME: Authentication route handlers for the tenant-scoped identity API
// ABOUTME: Registration, login, refresh, Apple sign-in, logout, and account deletion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Authentication routes
//!
//! Every handler runs after tenant resolution and receives the request's
//! [`TenantScope`]. Public endpoints are rate limited per client.

/// Request and response DTOs
pub mod types;

pub use types::{
    AppleSignInRequest, CredentialsRequest, DeleteAccountRequest, MessageResponse,
    RefreshTokenRequest,
};

use crate::auth::SessionPair;
use crate::errors::{AppError, AppResult};
use crate::middleware::{rate_limit_auth, Principal};
use crate::resources::ServerResources;
use crate::routes::AppJson;
use crate::tenant::TenantScope;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, post},
    Json, Router,
};
use std::sync::Arc;

/// Authentication routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        let public = Router::new()
            .route("/api/auth/register", post(Self::handle_register))
            .route("/api/auth/login", post(Self::handle_login))
            .route("/api/auth/refresh", post(Self::handle_refresh))
            .route("/api/auth/apple", post(Self::handle_apple))
            .route_layer(middleware::from_fn_with_state(
                resources.clone(),
                rate_limit_auth,
            ));

        let protected = Router::new()
            .route("/api/auth/logout", post(Self::handle_logout))
            .route("/api/auth/account", delete(Self::handle_delete_account));

        public.merge(protected).with_state(resources)
    }

    /// Create a password account and return its first session
    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        scope: TenantScope,
        AppJson(request): AppJson<CredentialsRequest>,
    ) -> AppResult<(StatusCode, Json<SessionPair>)> {
        let user = resources
            .passwords
            .register(&scope, &request.email, &request.password)
            .await?;
        let session = resources.tokens.issue_pair(&scope, &user).await?;
        Ok((StatusCode::CREATED, Json(session)))
    }

    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        scope: TenantScope,
        AppJson(request): AppJson<CredentialsRequest>,
    ) -> AppResult<Json<SessionPair>> {
        let session = resources
            .passwords
            .login(&scope, &request.email, &request.password)
            .await?;
        Ok(Json(session))
    }

    async fn handle_refresh(
        State(resources): State<Arc<ServerResources>>,
        scope: TenantScope,
        AppJson(request): AppJson<RefreshTokenRequest>,
    ) -> AppResult<Json<SessionPair>> {
        if request.refresh_token.is_empty() {
            return Err(AppError::invalid_input("refresh_token is required"));
        }
        let session = resources
            .tokens
            .refresh(&scope, &request.refresh_token)
            .await?;
        Ok(Json(session))
    }

    async fn handle_apple(
        State(resources): State<Arc<ServerResources>>,
        scope: TenantScope,
        AppJson(request): AppJson<AppleSignInRequest>,
    ) -> AppResult<Json<SessionPair>> {
        let session = resources
            .apple
            .sign_in(
                &scope,
                &request.identity_token,
                request.full_name.as_deref(),
                request.email.as_deref(),
            )
            .await?;
        Ok(Json(session))
    }

    /// Revoke a refresh token; unknown tokens succeed too
    async fn handle_logout(
        State(resources): State<Arc<ServerResources>>,
        scope: TenantScope,
        _principal: Principal,
        AppJson(request): AppJson<RefreshTokenRequest>,
    ) -> AppResult<Json<MessageResponse>> {
        resources.tokens.revoke(&scope, &request.refresh_token).await?;
        Ok(Json(MessageResponse::new("Logged out successfully")))
    }

    async fn handle_delete_account(
        State(resources): State<Arc<ServerResources>>,
        scope: TenantScope,
        principal: Principal,
        body: Option<AppJson<DeleteAccountRequest>>,
    ) -> AppResult<Json<MessageResponse>> {
        // Apple accounts may send no body at all
        let request = body.map(|AppJson(request)| request).unwrap_or_default();
        resources
            .passwords
            .delete_account(&scope, principal.user_id()?, request.password.as_deref())
            .await?;
        Ok(Json(MessageResponse::new("Account deleted successfully")))
    }
}
