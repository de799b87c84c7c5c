// ABOUTME: Integration tests for Apple Sign In against a local JWKS endpoint
// ABOUTME: Signs identity tokens with a test RSA key and exercises verification and account upsert
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

mod common;

use axum::body::Body;
use axum::{routing::get, Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use common::{
    access_token, create_test_resources_with, error_code, error_message, register_user, request,
    send, test_config, APP_A, APP_A_BUNDLE_ID, APP_B,
};
use http::{Method, Request, StatusCode};
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use unified_backend::plugins::PluginRegistry;
use unified_backend::server::build_router;

const TEST_KID: &str = "test-kid";
const APPLE_ISSUER: &str = "https://appleid.apple.com";

static TEST_KEY: OnceLock<RsaPrivateKey> = OnceLock::new();

fn test_key() -> &'static RsaPrivateKey {
    TEST_KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
}

fn jwks_body() -> Value {
    let public = test_key().to_public_key();
    json!({
        "keys": [{
            "kty": "RSA",
            "kid": TEST_KID,
            "use": "sig",
            "alg": "RS256",
            "n": URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
        }]
    })
}

/// Serve `body` at `/auth/keys`, optionally after a delay
async fn spawn_jwks_server(body: Value, delay: Option<Duration>) -> String {
    let app = Router::new().route(
        "/auth/keys",
        get(move || {
            let body = body.clone();
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Json(body)
            }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/auth/keys")
}

async fn apple_app(delay: Option<Duration>, fetch_timeout: Duration) -> Router {
    let mut config = test_config();
    config.apple.jwks_url = spawn_jwks_server(jwks_body(), delay).await;
    config.apple.fetch_timeout = fetch_timeout;
    let resources = create_test_resources_with(config, PluginRegistry::with_builtin_plugins())
        .await
        .unwrap();
    build_router(resources)
}

fn encode_segment(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(value.to_string())
}

fn sign(header: &Value, claims: &Value) -> String {
    let signing_input = format!("{}.{}", encode_segment(header), encode_segment(claims));
    let signing_key = SigningKey::<Sha256>::new(test_key().clone());
    let signature = signing_key.sign(signing_input.as_bytes());
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
}

fn rs256_header() -> Value {
    json!({ "alg": "RS256", "kid": TEST_KID })
}

fn claims(sub: &str, email: Option<&str>) -> Value {
    let now = Utc::now().timestamp();
    let mut claims = json!({
        "iss": APPLE_ISSUER,
        "aud": APP_A_BUNDLE_ID,
        "sub": sub,
        "iat": now,
        "exp": now + 600,
    });
    if let Some(email) = email {
        claims["email"] = json!(email);
        claims["email_verified"] = json!("true");
    }
    claims
}

fn apple_request(app_id: &str, body: Value) -> Request<Body> {
    request(Method::POST, "/api/auth/apple", Some(app_id), None, Some(body))
}

async fn assert_rejected(app: &Router, token: String) {
    let (status, body) = send(app, apple_request(APP_A, json!({ "identity_token": token }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");
    assert_eq!(error_code(&body), "VERIFICATION_FAILED");
    assert_eq!(error_message(&body), "Failed to verify Apple identity token");
}

#[tokio::test]
async fn test_first_sign_in_creates_account_and_repeat_reuses_it() {
    let app = apple_app(None, Duration::from_secs(5)).await;
    let token = sign(&rs256_header(), &claims("001.alpha", Some("Alpha@Example.com")));

    let (status, first) = send(
        &app,
        apple_request(
            APP_A,
            json!({ "identity_token": token, "full_name": "Alpha Tester" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["user"]["email"], "alpha@example.com");
    assert_eq!(first["user"]["is_apple_user"], true);

    // Apple omits the email after the first authorization
    let token = sign(&rs256_header(), &claims("001.alpha", None));
    let (status, second) = send(&app, apple_request(APP_A, json!({ "identity_token": token }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["user"]["id"], first["user"]["id"]);
}

#[tokio::test]
async fn test_verified_email_links_existing_password_account() {
    let app = apple_app(None, Duration::from_secs(5)).await;
    let existing = register_user(&app, APP_A, "link@example.com").await;

    let token = sign(&rs256_header(), &claims("001.link", Some("LINK@example.com")));
    let (status, session) = send(&app, apple_request(APP_A, json!({ "identity_token": token }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["id"], existing["user"]["id"]);
    assert_eq!(session["user"]["is_apple_user"], true);
}

#[tokio::test]
async fn test_email_fallbacks_when_claim_has_none() {
    let app = apple_app(None, Duration::from_secs(5)).await;

    let token = sign(&rs256_header(), &claims("001.given", None));
    let (status, session) = send(
        &app,
        apple_request(
            APP_A,
            json!({ "identity_token": token, "email": "Given@Example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["email"], "given@example.com");

    let token = sign(&rs256_header(), &claims("001.HIDDEN", None));
    let (status, session) = send(&app, apple_request(APP_A, json!({ "identity_token": token }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["email"], "001.hidden@apple.invalid");
}

#[tokio::test]
async fn test_unverified_claim_email_is_not_trusted_for_linking() {
    let app = apple_app(None, Duration::from_secs(5)).await;
    let existing = register_user(&app, APP_A, "victim@example.com").await;

    let mut unverified = claims("001.attacker", Some("victim@example.com"));
    unverified["email_verified"] = json!(false);
    let token = sign(&rs256_header(), &unverified);

    let (status, session) = send(&app, apple_request(APP_A, json!({ "identity_token": token }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(session["user"]["id"], existing["user"]["id"]);
    assert_eq!(session["user"]["email"], "001.attacker@apple.invalid");
}

#[tokio::test]
async fn test_invalid_tokens_are_rejected() {
    let app = apple_app(None, Duration::from_secs(5)).await;

    let mut wrong_audience = claims("001.bad", None);
    wrong_audience["aud"] = json!("com.other.app");
    assert_rejected(&app, sign(&rs256_header(), &wrong_audience)).await;

    let mut wrong_issuer = claims("001.bad", None);
    wrong_issuer["iss"] = json!("https://evil.example.com");
    assert_rejected(&app, sign(&rs256_header(), &wrong_issuer)).await;

    let mut expired = claims("001.bad", None);
    expired["exp"] = json!(Utc::now().timestamp() - 1);
    assert_rejected(&app, sign(&rs256_header(), &expired)).await;

    let unknown_kid = json!({ "alg": "RS256", "kid": "rotated-away" });
    assert_rejected(&app, sign(&unknown_kid, &claims("001.bad", None))).await;

    let none_alg = format!(
        "{}.{}.",
        encode_segment(&json!({ "alg": "none", "kid": TEST_KID })),
        encode_segment(&claims("001.bad", None))
    );
    assert_rejected(&app, none_alg).await;

    let hs256 = sign(
        &json!({ "alg": "HS256", "kid": TEST_KID }),
        &claims("001.bad", None),
    );
    assert_rejected(&app, hs256).await;

    // Valid signature over different claims
    let genuine = sign(&rs256_header(), &claims("001.bad", None));
    let signature = genuine.rsplit('.').next().unwrap();
    let forged = format!(
        "{}.{}.{signature}",
        encode_segment(&rs256_header()),
        encode_segment(&claims("001.admin", None))
    );
    assert_rejected(&app, forged).await;

    assert_rejected(&app, "only.two".to_owned()).await;
}

#[tokio::test]
async fn test_input_and_tenant_configuration_errors() {
    let app = apple_app(None, Duration::from_secs(5)).await;

    let (status, body) = send(&app, apple_request(APP_A, json!({ "identity_token": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "identity_token is required");

    let token = sign(&rs256_header(), &claims("001.b", None));
    let (status, body) = send(&app, apple_request(APP_B, json!({ "identity_token": token }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Apple Sign In not configured for this app");
}

#[tokio::test]
async fn test_slow_key_endpoint_fails_within_timeout() {
    let app = apple_app(Some(Duration::from_secs(5)), Duration::from_millis(300)).await;
    let token = sign(&rs256_header(), &claims("001.slow", None));

    let started = Instant::now();
    assert_rejected(&app, token).await;
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_apple_account_deletes_without_password() {
    let app = apple_app(None, Duration::from_secs(5)).await;
    let token = sign(&rs256_header(), &claims("001.leaver", Some("leaver@example.com")));
    let (_, session) = send(&app, apple_request(APP_A, json!({ "identity_token": token }))).await;

    let (status, body) = send(
        &app,
        request(
            Method::DELETE,
            "/api/auth/account",
            Some(APP_A),
            Some(&access_token(&session)),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}
