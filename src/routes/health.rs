// ABOUTME: Health check route handler for service monitoring
// ABOUTME: Reports database reachability and the number of loaded tenants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health check routes for service monitoring
//!
//! `/api/health` is exempt from tenant resolution so load balancers can call
//! it without an `X-App-ID` header.

use crate::resources::ServerResources;
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Health check body
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests
    pub status: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// `ok` or `unhealthy`
    pub db: String,
    /// Number of loaded tenants
    pub app_count: usize,
}

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health check route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/health", get(Self::handle_health))
            .with_state(resources)
    }

    async fn handle_health(State(resources): State<Arc<ServerResources>>) -> Json<HealthResponse> {
        let db = match resources.database.ping().await {
            Ok(()) => "ok",
            Err(e) => {
                warn!(error = %e, "Health check database ping failed");
                "unhealthy"
            }
        };

        Json(HealthResponse {
            status: "ok".to_owned(),
            timestamp: Utc::now().to_rfc3339(),
            db: db.to_owned(),
            app_count: resources.registry.len(),
        })
    }
}
