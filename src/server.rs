// ABOUTME: HTTP server assembly: route composition, middleware stack, and graceful shutdown
// ABOUTME: Every request passes request-id, tracing, CORS, timeout, and tenant resolution before handlers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # HTTP Server
//!
//! Layer order, outermost first:
//! 1. request id assignment (`x-request-id`)
//! 2. request tracing span
//! 3. request id propagation to the response
//! 4. CORS
//! 5. request timeout
//! 6. tenant scope resolution
//!
//! Route level guards (rate limit, principal, admin, feature gate) are
//! attached by the route groups themselves.

use crate::errors::{AppError, AppResult};
use crate::middleware::{create_request_span, setup_cors, tenant_scope_middleware};
use crate::resources::ServerResources;
use crate::routes::{AuthRoutes, HealthRoutes, LegalRoutes};
use axum::{middleware::from_fn_with_state, Router};
use std::future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Upper bound on handler time, including the Apple key fetch
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Compose the full application router
#[must_use]
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let plugin_routes = resources.plugins.mount(&resources);

    let cross_cutting = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(create_request_span))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(setup_cors(&resources.config.http))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    Router::new()
        .merge(HealthRoutes::routes(resources.clone()))
        .merge(LegalRoutes::routes(resources.clone()))
        .merge(AuthRoutes::routes(resources.clone()))
        .merge(plugin_routes)
        .layer(from_fn_with_state(resources, tenant_scope_middleware))
        .layer(cross_cutting)
}

/// Bind the configured port and serve until a shutdown signal arrives
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails
pub async fn run(resources: Arc<ServerResources>) -> AppResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], resources.config.http.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::config(format!("Failed to bind {addr}: {e}")))?;

    info!(%addr, tenants = resources.registry.len(), "HTTP server listening");

    let app = build_router(resources);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::internal(format!("HTTP server error: {e}")))?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
