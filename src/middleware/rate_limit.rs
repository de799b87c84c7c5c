// ABOUTME: Per-client fixed-window rate limiting for the public authentication endpoints
// ABOUTME: Keys clients by peer address (or a trusted X-Forwarded-For hop); excess requests get 429
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::AppError;
use crate::resources::ServerResources;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use http::header::RETRY_AFTER;
use http::{HeaderMap, HeaderValue};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use unified_core::constants::headers::X_FORWARDED_FOR;

const WINDOW: Duration = Duration::from_secs(60);
/// New clients beyond this many share the overflow bucket until the next sweep
const MAX_TRACKED_CLIENTS: usize = 50_000;
const OVERFLOW_KEY: &str = "overflow";

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request may proceed
    Allowed,
    /// Window exhausted; retry after this many seconds
    Limited {
        /// Seconds until the window resets
        retry_after_secs: u64,
    },
}

/// Fixed one-minute window counter per client key
///
/// Uses `DashMap` so concurrent clients only contend on their own shard.
/// Expired windows are swept at most once per window, whatever the map size.
#[derive(Clone)]
pub struct AuthRateLimiter {
    state: Arc<DashMap<String, (u32, Instant)>>,
    last_sweep: Arc<Mutex<Instant>>,
    limit_per_minute: u32,
    trust_forwarded_for: bool,
}

impl AuthRateLimiter {
    /// Create a limiter; a limit of 0 disables it
    ///
    /// With `trust_forwarded_for` the first `X-Forwarded-For` hop identifies
    /// the client, otherwise only the peer address does.
    #[must_use]
    pub fn new(limit_per_minute: u32, trust_forwarded_for: bool) -> Self {
        Self {
            state: Arc::new(DashMap::new()),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
            limit_per_minute,
            trust_forwarded_for,
        }
    }

    /// Whether `X-Forwarded-For` is honoured when keying clients
    #[must_use]
    pub const fn trusts_forwarded_for(&self) -> bool {
        self.trust_forwarded_for
    }

    /// Number of client windows currently held
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.state.len()
    }

    /// Whether the limiter is active
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.limit_per_minute > 0
    }

    /// Configured requests per minute
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit_per_minute
    }

    /// Count a request from `client` and decide whether it may proceed
    #[must_use]
    pub fn check(&self, client: &str) -> RateLimitDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> RateLimitDecision {
        if !self.is_enabled() {
            return RateLimitDecision::Allowed;
        }

        self.sweep_expired(now);

        let key = if self.state.len() >= MAX_TRACKED_CLIENTS && !self.state.contains_key(client) {
            OVERFLOW_KEY
        } else {
            client
        };

        let mut entry = self.state.entry(key.to_owned()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) >= WINDOW {
            *count = 0;
            *window_start = now;
        }

        let decision = if *count >= self.limit_per_minute {
            let elapsed = now.duration_since(*window_start);
            RateLimitDecision::Limited {
                retry_after_secs: WINDOW.saturating_sub(elapsed).as_secs().max(1),
            }
        } else {
            *count += 1;
            RateLimitDecision::Allowed
        };
        drop(entry);

        decision
    }

    /// Drop expired windows, at most once per window
    fn sweep_expired(&self, now: Instant) {
        // Another request is already sweeping
        let Ok(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last_sweep) < WINDOW {
            return;
        }
        *last_sweep = now;
        drop(last_sweep);

        let before = self.state.len();
        self.state
            .retain(|_, (_, start)| now.saturating_duration_since(*start) < WINDOW);
        debug!(
            removed = before.saturating_sub(self.state.len()),
            "Swept expired rate limit windows"
        );
    }
}

/// Apply the auth rate limit to the wrapped routes
pub async fn rate_limit_auth(
    State(resources): State<Arc<ServerResources>>,
    req: Request,
    next: Next,
) -> Response {
    let limiter = &resources.rate_limiter;
    if !limiter.is_enabled() {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let client = client_key(req.headers(), peer.as_deref(), limiter.trusts_forwarded_for());

    match limiter.check(&client) {
        RateLimitDecision::Allowed => next.run(req).await,
        RateLimitDecision::Limited { retry_after_secs } => {
            warn!(client = %client, path = %req.uri().path(), "Auth rate limit exceeded");
            let mut response = AppError::rate_limited(limiter.limit()).into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
    }
}

/// Peer address, else a shared bucket
///
/// The first `X-Forwarded-For` hop takes precedence only when the deployment
/// trusts its proxy to set that header.
#[must_use]
pub fn client_key(headers: &HeaderMap, peer: Option<&str>, trust_forwarded_for: bool) -> String {
    let forwarded = trust_forwarded_for
        .then(|| headers.get(X_FORWARDED_FOR))
        .flatten()
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());

    forwarded.or(peer).unwrap_or("unknown").to_owned()
}
