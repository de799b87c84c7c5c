// ABOUTME: Tenant-aware logging utilities for structured, contextual logging
// ABOUTME: Records tenant identifiers on spans and emits auth and security events without secrets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use tracing::{info, warn, Span};
use uuid::Uuid;

/// Tenant-aware logging utilities
///
/// Callers pass identifiers only. Passwords, raw refresh tokens, and identity
/// tokens never reach these functions.
pub struct TenantLogger;

impl TenantLogger {
    /// Log an authentication event with tenant context
    pub fn log_auth_event(
        tenant_id: &str,
        user_id: Option<Uuid>,
        auth_method: &str,
        success: bool,
        error_details: Option<&str>,
    ) {
        if success {
            info!(
                tenant_id = %tenant_id,
                user_id = ?user_id,
                auth_method = %auth_method,
                event_type = "authentication",
                "Authentication successful"
            );
        } else {
            warn!(
                tenant_id = %tenant_id,
                user_id = ?user_id,
                auth_method = %auth_method,
                error_details = ?error_details,
                event_type = "authentication",
                "Authentication failed"
            );
        }
    }

    /// Log a security-relevant event such as a denied admin request
    pub fn log_security_event(tenant_id: Option<&str>, event_type: &str, details: &str) {
        warn!(
            tenant_id = ?tenant_id,
            security.event = %event_type,
            security.details = %details,
            "Security event"
        );
    }
}

/// Record the resolved tenant on the current request span
pub fn record_tenant_context(tenant_id: &str) {
    Span::current().record("tenant_id", tenant_id);
}
