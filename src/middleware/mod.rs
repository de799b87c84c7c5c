// ABOUTME: HTTP middleware for tenant resolution, authentication, admin checks, and rate limiting
// ABOUTME: Also provides CORS configuration and request span construction for structured logging
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod admin;
pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod tenant;
pub mod tracing;

// Admin authorization
pub use admin::{require_admin, AdminAuthorizer, AdminGrant};

// Bearer authentication
pub use auth::{bearer_token, require_principal, MaybePrincipal, Principal};

// CORS configuration
pub use cors::setup_cors;

// Auth endpoint rate limiting
pub use rate_limit::{rate_limit_auth, AuthRateLimiter, RateLimitDecision};

// Tenant resolution
pub use tenant::tenant_scope_middleware;

// Request tracing
pub use self::tracing::create_request_span;
