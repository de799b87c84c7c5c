// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Header names, tenant-exempt paths, token lifetimes, and Apple identity constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// HTTP header and query parameter names
pub mod headers {
    /// Explicit tenant selector header
    pub const X_APP_ID: &str = "x-app-id";
    /// Static admin token header
    pub const X_ADMIN_TOKEN: &str = "x-admin-token";
    /// Request correlation header
    pub const X_REQUEST_ID: &str = "x-request-id";
    /// Proxy-provided client address chain
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
    /// Query parameter fallback for tenant selection
    pub const APP_ID_QUERY_PARAM: &str = "app_id";
}

/// Route prefixes and paths
pub mod routes {
    /// Path prefixes that never require tenant resolution
    pub const TENANT_EXEMPT_PREFIXES: &[&str] = &["/api/health", "/api/legal/", "/api/webhooks/"];
    /// API base path
    pub const API_BASE: &str = "/api";
    /// Admin API base path
    pub const ADMIN_BASE: &str = "/api/admin";
}

/// Password and token lifetimes
pub mod auth {
    /// Minimum accepted password length
    pub const MIN_PASSWORD_LENGTH: usize = 8;
    /// Default access token lifetime in minutes
    pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 15;
    /// Default refresh token lifetime in days
    pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;
    /// Random bytes in a raw refresh token
    pub const REFRESH_TOKEN_BYTES: usize = 32;
    /// Default auth-route requests per client per minute
    pub const DEFAULT_AUTH_RATE_LIMIT_PER_MINUTE: u32 = 20;
}

/// Sign in with Apple
pub mod apple {
    /// Issuer every Apple identity token must carry
    pub const ISSUER: &str = "https://appleid.apple.com";
    /// Apple's published signing keys
    pub const JWKS_URL: &str = "https://appleid.apple.com/auth/keys";
    /// The only signature algorithm accepted for identity tokens
    pub const SIGNING_ALGORITHM: &str = "RS256";
    /// Key cache lifetime (24 hours)
    pub const DEFAULT_KEY_CACHE_TTL_SECS: u64 = 86_400;
    /// Key fetch timeout
    pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
    /// Domain used for accounts created without any email address
    pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "apple.invalid";
}

/// Service identity for logging
pub mod service_names {
    /// Service name reported in logs
    pub const UNIFIED_BACKEND: &str = "unified-backend";
}
