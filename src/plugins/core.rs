// ABOUTME: Core feature plugin trait and the context handed to plugins at mount time
// ABOUTME: Plugins declare their tables, feature flag, migrations, and user/admin routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::database::Database;
use crate::errors::AppResult;
use crate::tenant::TenantRegistry;
use async_trait::async_trait;
use axum::Router;
use std::sync::Arc;

/// Shared resources a plugin may capture in its route state
#[derive(Clone)]
pub struct PluginContext {
    /// Credential store connection pool
    pub database: Database,
    /// Loaded tenants
    pub registry: Arc<TenantRegistry>,
}

/// Routes a plugin contributes
///
/// `user` routes are mounted under `/api` behind the principal guard; `admin`
/// routes under `/api/admin` behind the admin guard. Both see the resolved
/// `TenantScope` in request extensions.
#[derive(Default)]
pub struct PluginRoutes {
    /// Routes for authenticated users
    pub user: Option<Router>,
    /// Routes for admins
    pub admin: Option<Router>,
}

/// A tenant-aware feature mounted onto the core server
#[async_trait]
pub trait FeaturePlugin: Send + Sync {
    /// Unique plugin identifier
    fn id(&self) -> &'static str;

    /// Tenant feature flag required to reach this plugin's routes
    fn required_feature(&self) -> Option<&'static str> {
        None
    }

    /// Tables with `app_id` and `user_id` columns purged when an account is deleted
    fn user_tables(&self) -> &'static [&'static str] {
        &[]
    }

    /// Create or upgrade the plugin's tables
    ///
    /// # Errors
    ///
    /// Returns an error if a schema statement fails
    async fn migrate(&self, database: &Database) -> AppResult<()>;

    /// Insert per-tenant defaults after migration
    ///
    /// # Errors
    ///
    /// Returns an error if seeding fails
    async fn seed(&self, _database: &Database, _registry: &TenantRegistry) -> AppResult<()> {
        Ok(())
    }

    /// Routes this plugin exposes
    fn exposes(&self, context: &PluginContext) -> PluginRoutes;
}
