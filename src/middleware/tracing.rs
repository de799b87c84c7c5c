// ABOUTME: Request span construction for the HTTP trace layer
// ABOUTME: Creates one span per request with request id and an empty tenant_id filled in later
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use axum::extract::Request;
use tracing::field::Empty;
use tracing::{info_span, Span};
use unified_core::constants::headers::X_REQUEST_ID;

/// Create the tracing span for an HTTP request
///
/// `tenant_id` starts empty and is recorded by the tenant middleware once the
/// request's tenant is resolved.
pub fn create_request_span(req: &Request) -> Span {
    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %request_id,
        tenant_id = Empty,
    )
}
