// ABOUTME: Plugin registry holding every feature plugin mounted on the server
// ABOUTME: Runs plugin migrations, collects user-scoped tables, and mounts guarded routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::core::{FeaturePlugin, PluginContext, PluginRoutes};
use super::remote_config::RemoteConfigPlugin;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::middleware::{require_admin, require_principal};
use crate::resources::ServerResources;
use crate::tenant::{TenantRegistry, TenantScope};
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use unified_core::constants::routes::{ADMIN_BASE, API_BASE};

/// Registry of all feature plugins
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn FeaturePlugin>>,
}

impl PluginRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in plugins
    #[must_use]
    pub fn with_builtin_plugins() -> Self {
        let mut registry = Self::new();
        registry.plugins.push(Arc::new(RemoteConfigPlugin));
        registry
    }

    /// Register a plugin
    ///
    /// # Errors
    ///
    /// Returns a config error if a plugin with the same id is already registered
    pub fn register(&mut self, plugin: Arc<dyn FeaturePlugin>) -> AppResult<()> {
        if self.plugins.iter().any(|p| p.id() == plugin.id()) {
            return Err(AppError::config(format!(
                "Plugin '{}' is already registered",
                plugin.id()
            )));
        }
        info!(plugin = plugin.id(), "Registering plugin");
        self.plugins.push(plugin);
        Ok(())
    }

    /// Registered plugin ids
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.id()).collect()
    }

    /// Run every plugin's migrations then seeds
    ///
    /// # Errors
    ///
    /// Returns the first plugin failure
    pub async fn initialize(&self, database: &Database, registry: &TenantRegistry) -> AppResult<()> {
        for plugin in &self.plugins {
            plugin.migrate(database).await?;
            plugin.seed(database, registry).await?;
            debug!(plugin = plugin.id(), "Plugin initialized");
        }
        Ok(())
    }

    /// Every table the account-deletion cascade must purge, deduplicated
    #[must_use]
    pub fn user_tables(&self) -> Vec<&'static str> {
        let mut seen = HashSet::new();
        self.plugins
            .iter()
            .flat_map(|p| p.user_tables().iter().copied())
            .filter(|table| seen.insert(*table))
            .collect()
    }

    /// Mount all plugin routes with their guards
    pub fn mount(&self, resources: &Arc<ServerResources>) -> Router {
        let context = PluginContext {
            database: resources.database.clone(),
            registry: resources.registry.clone(),
        };

        let mut user_routes = Router::new();
        let mut admin_routes = Router::new();

        for plugin in &self.plugins {
            let PluginRoutes { user, admin } = plugin.exposes(&context);
            let gate = plugin
                .required_feature()
                .map(|feature| FeatureGate {
                    registry: resources.registry.clone(),
                    feature,
                });

            if let Some(router) = user {
                let router = router.route_layer(middleware::from_fn(require_principal));
                user_routes = user_routes.merge(with_gate(router, gate.clone()));
            }
            if let Some(router) = admin {
                let router = router
                    .route_layer(middleware::from_fn_with_state(resources.clone(), require_admin));
                admin_routes = admin_routes.merge(with_gate(router, gate));
            }
        }

        Router::new()
            .nest(API_BASE, user_routes)
            .nest(ADMIN_BASE, admin_routes)
    }
}

#[derive(Clone)]
struct FeatureGate {
    registry: Arc<TenantRegistry>,
    feature: &'static str,
}

fn with_gate(router: Router, gate: Option<FeatureGate>) -> Router {
    match gate {
        Some(gate) => router.route_layer(middleware::from_fn_with_state(gate, require_feature)),
        None => router,
    }
}

/// Hide routes from tenants without the feature flag
async fn require_feature(
    State(gate): State<FeatureGate>,
    scope: TenantScope,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if gate.registry.has_feature(scope.tenant_id(), gate.feature) {
        Ok(next.run(req).await)
    } else {
        debug!(tenant_id = %scope, feature = gate.feature, "Feature disabled for tenant");
        Err(AppError::not_found("Route"))
    }
}
