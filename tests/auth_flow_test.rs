// ABOUTME: Integration tests for password registration, login, refresh rotation, logout, and deletion
// ABOUTME: Drives the full router with tower oneshot requests against an in-memory database
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

mod common;

use axum::body::Body;
use axum::extract::ConnectInfo;
use chrono::{Duration, Utc};
use common::{
    access_token, create_test_app, create_test_resources_with, error_code, error_message,
    refresh_token, register_user, request, send, send_raw, test_config, test_registry, APP_A,
    TEST_PASSWORD,
};
use http::header::{CONTENT_TYPE, RETRY_AFTER};
use http::{Method, StatusCode};
use serde_json::json;
use std::net::SocketAddr;
use tempfile::TempDir;
use unified_backend::auth::{hash_refresh_token, TokenIssuer};
use unified_backend::database::Database;
use unified_backend::plugins::PluginRegistry;
use unified_backend::resources::ServerResources;
use unified_backend::server::build_router;

#[tokio::test]
async fn test_register_returns_session_with_normalized_email() {
    let (app, _) = create_test_app().await.unwrap();

    let session = register_user(&app, APP_A, "  Alice@Example.COM ").await;

    assert!(!access_token(&session).is_empty());
    assert!(!refresh_token(&session).is_empty());
    assert_eq!(session["user"]["email"], "alice@example.com");
    assert_eq!(session["user"]["is_apple_user"], false);
    assert!(session["user"]["id"].as_str().is_some());
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let (app, _) = create_test_app().await.unwrap();
    register_user(&app, APP_A, "bob@example.com").await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/register",
            Some(APP_A),
            None,
            Some(json!({ "email": "BOB@example.com", "password": TEST_PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "RESOURCE_ALREADY_EXISTS");

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/register",
            Some(APP_A),
            None,
            Some(json!({ "email": "carol@example.com", "password": "short" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_INPUT");

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/register",
            Some(APP_A),
            None,
            Some(json!({ "email": "not-an-email", "password": TEST_PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (app, _) = create_test_app().await.unwrap();
    register_user(&app, APP_A, "dana@example.com").await;

    let login = |email: &str, password: &str| {
        request(
            Method::POST,
            "/api/auth/login",
            Some(APP_A),
            None,
            Some(json!({ "email": email, "password": password })),
        )
    };

    let (status, session) = send(&app, login("Dana@Example.com", TEST_PASSWORD)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["email"], "dana@example.com");

    let (wrong_status, wrong_body) = send(&app, login("dana@example.com", "wrong-password")).await;
    let (unknown_status, unknown_body) = send(&app, login("nobody@example.com", TEST_PASSWORD)).await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(error_message(&wrong_body), "Invalid email or password");
}

#[tokio::test]
async fn test_refresh_rotates_and_consumes_token() {
    let (app, _) = create_test_app().await.unwrap();
    let session = register_user(&app, APP_A, "erin@example.com").await;
    let original = refresh_token(&session);

    let refresh = |token: &str| {
        request(
            Method::POST,
            "/api/auth/refresh",
            Some(APP_A),
            None,
            Some(json!({ "refresh_token": token })),
        )
    };

    let (status, rotated) = send(&app, refresh(&original)).await;
    assert_eq!(status, StatusCode::OK);
    let next = refresh_token(&rotated);
    assert_ne!(next, original);
    assert_eq!(rotated["user"]["id"], session["user"]["id"]);

    let (status, body) = send(&app, refresh(&original)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_TOKEN");
    assert_eq!(error_message(&body), "Invalid or expired refresh token");

    let (status, _) = send(&app, refresh(&next)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, refresh("")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_INPUT");
}

#[tokio::test]
async fn test_concurrent_refresh_yields_exactly_one_session() {
    let (_, resources) = create_test_app().await.unwrap();
    let scope = resources.registry.scope(APP_A).unwrap();

    let user = resources
        .passwords
        .register(&scope, "frank@example.com", TEST_PASSWORD)
        .await
        .unwrap();
    let pair = resources.tokens.issue_pair(&scope, &user).await.unwrap();

    let (first, second) = tokio::join!(
        resources.tokens.refresh(&scope, &pair.refresh_token),
        resources.tokens.refresh(&scope, &pair.refresh_token),
    );

    let successes = [first.is_ok(), second.is_ok()]
        .into_iter()
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_refresh_on_file_database_yields_exactly_one_session() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("race.db").display());
    let database = Database::new(&url).await.unwrap();
    let resources = ServerResources::with_database(
        test_config(),
        test_registry(),
        PluginRegistry::with_builtin_plugins(),
        database,
    )
    .await
    .unwrap();
    let scope = resources.registry.scope(APP_A).unwrap();

    let user = resources
        .passwords
        .register(&scope, "racer@example.com", TEST_PASSWORD)
        .await
        .unwrap();
    let pair = resources.tokens.issue_pair(&scope, &user).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let tokens = resources.tokens.clone();
            let scope = scope.clone();
            let raw = pair.refresh_token.clone();
            tokio::spawn(async move { tokens.refresh(&scope, &raw).await })
        })
        .collect();

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err.http_status(), 401, "{err}"),
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn test_expired_refresh_token_is_rejected() {
    let (_, resources) = create_test_app().await.unwrap();
    let scope = resources.registry.scope(APP_A).unwrap();
    let user = resources
        .passwords
        .register(&scope, "gina@example.com", TEST_PASSWORD)
        .await
        .unwrap();

    let mut auth = test_config().auth;
    auth.refresh_token_ttl = Duration::seconds(-1);
    let short_lived = TokenIssuer::new(resources.database.clone(), &auth);
    let pair = short_lived.issue_pair(&scope, &user).await.unwrap();

    let record = resources
        .database
        .get_refresh_token(&scope, &hash_refresh_token(&pair.refresh_token))
        .await
        .unwrap()
        .expect("token persisted by hash");
    // Expired rows stay unrevoked; the consume step filters on expires_at
    assert!(!record.revoked);
    assert!(record.expires_at < Utc::now());

    let err = resources
        .tokens
        .refresh(&scope, &pair.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 401);
}

#[tokio::test]
async fn test_logout_is_idempotent_and_requires_principal() {
    let (app, _) = create_test_app().await.unwrap();
    let session = register_user(&app, APP_A, "hank@example.com").await;
    let access = access_token(&session);
    let refresh = refresh_token(&session);

    for _ in 0..2 {
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/auth/logout",
                Some(APP_A),
                Some(&access),
                Some(json!({ "refresh_token": refresh })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out successfully");
    }

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/refresh",
            Some(APP_A),
            None,
            Some(json!({ "refresh_token": refresh })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/logout",
            Some(APP_A),
            None,
            Some(json!({ "refresh_token": refresh })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "AUTH_REQUIRED");
}

#[tokio::test]
async fn test_forged_bearer_is_rejected_on_protected_route() {
    let (app, _) = create_test_app().await.unwrap();

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/logout",
            Some(APP_A),
            Some("not.a.token"),
            Some(json!({ "refresh_token": "x" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "AUTH_INVALID");
    assert_eq!(error_message(&body), "Invalid or expired access token");
}

#[tokio::test]
async fn test_delete_account_flow() {
    let (app, _) = create_test_app().await.unwrap();
    let session = register_user(&app, APP_A, "ivy@example.com").await;
    let access = access_token(&session);

    let delete = |body: serde_json::Value| {
        request(
            Method::DELETE,
            "/api/auth/account",
            Some(APP_A),
            Some(&access),
            Some(body),
        )
    };

    let (status, body) = send(&app, delete(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Password is required");

    let (status, body) = send(&app, delete(json!({ "password": "wrong-password" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_CREDENTIALS");

    let (status, body) = send(&app, delete(json!({ "password": TEST_PASSWORD }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Account deleted successfully");

    // The access token outlives the account, but the account is gone
    let (status, body) = send(&app, delete(json!({ "password": TEST_PASSWORD }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "User not found");

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/refresh",
            Some(APP_A),
            None,
            Some(json!({ "refresh_token": refresh_token(&session) })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/login",
            Some(APP_A),
            None,
            Some(json!({ "email": "ivy@example.com", "password": TEST_PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Soft-deleted rows do not block re-registration
    register_user(&app, APP_A, "ivy@example.com").await;
}

#[tokio::test]
async fn test_auth_routes_are_rate_limited() {
    let mut config = test_config();
    config.http.auth_rate_limit_per_minute = 2;
    config.http.trust_forwarded_for = true;
    let resources = create_test_resources_with(config, PluginRegistry::with_builtin_plugins())
        .await
        .unwrap();
    let app = build_router(resources);

    let login = || {
        let mut req = request(
            Method::POST,
            "/api/auth/login",
            Some(APP_A),
            None,
            Some(json!({ "email": "jo@example.com", "password": TEST_PASSWORD })),
        );
        req.headers_mut()
            .insert("x-forwarded-for", "198.51.100.9".parse().unwrap());
        req
    };

    for _ in 0..2 {
        let (status, _, _) = send_raw(&app, login()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, headers, body) = send_raw(&app, login()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(headers.contains_key(RETRY_AFTER));
    assert!(body.contains("RATE_LIMIT_EXCEEDED"));

    // Another client keeps its own budget
    let mut other = login();
    other
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.1".parse().unwrap());
    let (status, _, _) = send_raw(&app, other).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_bodies_use_the_error_shape() {
    let (app, _) = create_test_app().await.unwrap();

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/register",
            Some(APP_A),
            None,
            Some(json!({ "email": "a@example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_INPUT");
    assert!(!error_message(&body).contains("password"));

    let mut broken = request(Method::POST, "/api/auth/login", Some(APP_A), None, None);
    *broken.body_mut() = Body::from(r#"{"email": "a@example.com", "#);
    broken
        .headers_mut()
        .insert(CONTENT_TYPE, "application/json".parse().unwrap());
    let (status, body) = send(&app, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_INPUT");
    assert_eq!(error_message(&body), "Request body is not valid JSON");

    // No content type at all
    let (status, body) = send(
        &app,
        request(Method::POST, "/api/auth/refresh", Some(APP_A), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_INPUT");
}

#[tokio::test]
async fn test_untrusted_forwarded_for_does_not_reset_the_budget() {
    let mut config = test_config();
    config.http.auth_rate_limit_per_minute = 2;
    let resources = create_test_resources_with(config, PluginRegistry::with_builtin_plugins())
        .await
        .unwrap();
    let app = build_router(resources);

    let login_from = |peer: [u8; 4], forwarded: &str| {
        let mut req = request(
            Method::POST,
            "/api/auth/login",
            Some(APP_A),
            None,
            Some(json!({ "email": "jo@example.com", "password": TEST_PASSWORD })),
        );
        req.headers_mut()
            .insert("x-forwarded-for", forwarded.parse().unwrap());
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 40_000))));
        req
    };

    let mut limited = 0;
    for i in 0..10 {
        let spoofed = format!("10.0.0.{i}");
        let (status, _, _) = send_raw(&app, login_from([192, 0, 2, 10], &spoofed)).await;
        if status == StatusCode::TOO_MANY_REQUESTS {
            limited += 1;
        }
    }
    assert_eq!(limited, 8);

    // A different peer still has its own budget
    let (status, _, _) = send_raw(&app, login_from([192, 0, 2, 11], "10.0.0.1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let (app, _) = create_test_app().await.unwrap();
    let (_, headers, _) = send_raw(&app, request(Method::GET, "/api/health", None, None, None)).await;
    assert!(headers.contains_key("x-request-id"));
}
