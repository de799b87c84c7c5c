// ABOUTME: Integration tests for the tenant-exempt public routes
// ABOUTME: Checks the health report and the per-tenant legal pages without an X-App-ID requirement
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

mod common;

use common::{create_test_app, request, send, send_raw, APP_A, APP_B};
use http::{header, Method, StatusCode};

#[tokio::test]
async fn test_health_needs_no_tenant() {
    let (app, _) = create_test_app().await.unwrap();

    let (status, body) = send(&app, request(Method::GET, "/api/health", None, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "ok");
    assert_eq!(body["app_count"], 2);
    assert!(body["timestamp"].as_str().is_some_and(|ts| !ts.is_empty()));

    // An unknown header is ignored on exempt routes
    let (status, _) = send(
        &app,
        request(Method::GET, "/api/health", Some("ghost-app"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_privacy_page_names_the_tenant() {
    let (app, _) = create_test_app().await.unwrap();

    let (status, headers, html) = send_raw(
        &app,
        request(
            Method::GET,
            &format!("/api/legal/privacy?app_id={APP_A}"),
            None,
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html")));
    assert!(html.contains("Privacy Policy - Recipe Box"));
    assert!(html.contains("support@app-a.app"));
}

#[tokio::test]
async fn test_terms_page_escapes_tenant_name_from_header() {
    let (app, _) = create_test_app().await.unwrap();

    let (status, _, html) = send_raw(
        &app,
        request(Method::GET, "/api/legal/terms", Some(APP_B), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Terms of Service - Habits &amp; Co"));
    assert!(!html.contains("Habits & Co"));
}

#[tokio::test]
async fn test_query_takes_precedence_over_header_on_legal_pages() {
    let (app, _) = create_test_app().await.unwrap();

    let (_, _, html) = send_raw(
        &app,
        request(
            Method::GET,
            &format!("/api/legal/terms?app_id={APP_A}"),
            Some(APP_B),
            None,
            None,
        ),
    )
    .await;
    assert!(html.contains("Recipe Box"));
}

#[tokio::test]
async fn test_legal_pages_fall_back_for_unknown_tenants() {
    let (app, _) = create_test_app().await.unwrap();

    for uri in ["/api/legal/privacy", "/api/legal/terms?app_id=ghost-app"] {
        let (status, _, html) = send_raw(&app, request(Method::GET, uri, None, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Our App"));
        assert!(html.contains("app's support page"));
    }
}
