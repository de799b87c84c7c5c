// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides the two-tenant registry, in-memory resources, and HTTP request helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `unified_backend`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::Router;
use http::{HeaderMap, Method, Request, StatusCode};
use serde_json::Value;
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Once};
use tower::ServiceExt;
use unified_backend::config::{
    AdminConfig, AppleConfig, AuthConfig, Environment, HttpConfig, ServerConfig,
};
use unified_backend::database::Database;
use unified_backend::plugins::PluginRegistry;
use unified_backend::resources::ServerResources;
use unified_backend::server::build_router;
use unified_backend::tenant::{TenantRegistry, TenantScope};

/// Tenant with Apple sign-in and the `beta_feed` feature
pub const APP_A: &str = "app-a";
/// Tenant with neither Apple sign-in nor features
pub const APP_B: &str = "app-b";
/// Apple audience of `APP_A`
pub const APP_A_BUNDLE_ID: &str = "com.example.recipebox";
/// Signing secret shared by every test issuer
pub const TEST_JWT_SECRET: &str = "test-secret-that-is-at-least-32-bytes-long!!";
/// Password used by helper-created accounts
pub const TEST_PASSWORD: &str = "correct-horse-battery";

const TEST_APPS_JSON: &str = r#"{
  "apps": [
    {
      "app_id": "app-a",
      "app_name": "Recipe Box",
      "bundle_id": "com.example.recipebox",
      "revenuecat_webhook_auth": "whsec-a",
      "features": { "beta_feed": true }
    },
    {
      "app_id": "app-b",
      "app_name": "Habits & Co",
      "bundle_id": "",
      "features": {}
    }
  ]
}"#;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// The two-tenant registry used across tests
pub fn test_registry() -> TenantRegistry {
    TenantRegistry::from_json(TEST_APPS_JSON).expect("test registry parses")
}

/// Scope for a registered test tenant
pub fn scope(app_id: &str) -> TenantScope {
    test_registry().scope(app_id).expect("test tenant exists")
}

/// Configuration with a low bcrypt cost and the rate limiter disabled
pub fn test_config() -> ServerConfig {
    let mut auth = AuthConfig::with_secret(TEST_JWT_SECRET);
    auth.bcrypt_cost = 4;

    ServerConfig {
        environment: Environment::Testing,
        database_url: "sqlite::memory:".to_owned(),
        apps_config_path: PathBuf::from("apps.json"),
        http: HttpConfig {
            port: 0,
            cors_origins: vec!["*".to_owned()],
            auth_rate_limit_per_minute: 0,
            trust_forwarded_for: false,
        },
        auth,
        admin: AdminConfig::default(),
        apple: AppleConfig::default(),
    }
}

/// Standard test database setup
pub async fn create_test_database() -> Result<Database> {
    init_test_logging();
    Ok(Database::new("sqlite::memory:").await?)
}

/// Resources over a fresh in-memory database with the built-in plugins
pub async fn create_test_resources() -> Result<Arc<ServerResources>> {
    create_test_resources_with(test_config(), PluginRegistry::with_builtin_plugins()).await
}

/// Resources with a custom configuration and plugin set
pub async fn create_test_resources_with(
    config: ServerConfig,
    plugins: PluginRegistry,
) -> Result<Arc<ServerResources>> {
    let database = create_test_database().await?;
    Ok(ServerResources::with_database(config, test_registry(), plugins, database).await?)
}

/// Full application router over default test resources
pub async fn create_test_app() -> Result<(Router, Arc<ServerResources>)> {
    let resources = create_test_resources().await?;
    Ok((build_router(resources.clone()), resources))
}

/// Request builder with optional tenant header, bearer token, and JSON body
pub fn request(
    method: Method,
    uri: &str,
    app_id: Option<&str>,
    bearer: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(app_id) = app_id {
        builder = builder.header("x-app-id", app_id);
    }
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request and return status, headers, and the raw body
pub async fn send_raw(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8_lossy(&bytes).into_owned())
}

/// Send a request and parse the body as JSON (`Value::Null` if empty or not JSON)
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send_raw(app, req).await;
    (status, serde_json::from_str(&body).unwrap_or(Value::Null))
}

/// Error code of a `{error:{code,message}}` body
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

/// Error message of a `{error:{code,message}}` body
pub fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap_or_default()
}

/// Register a password account over HTTP and return the session body
pub async fn register_user(app: &Router, app_id: &str, email: &str) -> Value {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/auth/register",
            Some(app_id),
            None,
            Some(serde_json::json!({ "email": email, "password": TEST_PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body
}

/// Access token from a session body
pub fn access_token(session: &Value) -> String {
    session["access_token"].as_str().unwrap().to_owned()
}

/// Refresh token from a session body
pub fn refresh_token(session: &Value) -> String {
    session["refresh_token"].as_str().unwrap().to_owned()
}
