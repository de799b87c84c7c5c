// ABOUTME: Centralized resource container shared by every route and middleware
// ABOUTME: Wires the registry, store, authenticators, Apple verifier, and plugins together once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Server Resources Module
//!
//! Built once at startup and shared as `Arc<ServerResources>` axum state.

use crate::apple::{AppleIdentityVerifier, AppleKeyStore, AppleSignIn};
use crate::auth::{PasswordAuthenticator, TokenIssuer};
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::AppResult;
use crate::middleware::{AdminAuthorizer, AuthRateLimiter};
use crate::plugins::PluginRegistry;
use crate::tenant::TenantRegistry;
use std::sync::Arc;
use tracing::info;

/// Shared server resources
#[derive(Clone)]
pub struct ServerResources {
    /// Immutable server configuration
    pub config: Arc<ServerConfig>,
    /// Credential store
    pub database: Database,
    /// Loaded tenants
    pub registry: Arc<TenantRegistry>,
    /// Session issuer and validator
    pub tokens: Arc<TokenIssuer>,
    /// Password account lifecycle
    pub passwords: PasswordAuthenticator,
    /// Apple sign-in flow
    pub apple: AppleSignIn,
    /// Admin route authorization
    pub admin: AdminAuthorizer,
    /// Public auth route rate limiter
    pub rate_limiter: AuthRateLimiter,
    /// Feature plugins
    pub plugins: Arc<PluginRegistry>,
}

impl ServerResources {
    /// Open the database, initialize plugins, and build every component
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated, a plugin
    /// fails to initialize, or a component rejects its configuration
    pub async fn new(
        config: ServerConfig,
        registry: TenantRegistry,
        plugins: PluginRegistry,
    ) -> AppResult<Arc<Self>> {
        let database = Database::new(&config.database_url).await?;
        Self::with_database(config, registry, plugins, database).await
    }

    /// Build resources on an already opened database
    ///
    /// # Errors
    ///
    /// Returns an error if a plugin fails to initialize or a component rejects its configuration
    pub async fn with_database(
        config: ServerConfig,
        registry: TenantRegistry,
        plugins: PluginRegistry,
        database: Database,
    ) -> AppResult<Arc<Self>> {
        let registry = Arc::new(registry);
        plugins.initialize(&database, &registry).await?;

        let tokens = Arc::new(TokenIssuer::new(database.clone(), &config.auth));
        let passwords = PasswordAuthenticator::new(
            database.clone(),
            tokens.clone(),
            config.auth.bcrypt_cost,
            plugins.user_tables(),
        )?;

        let key_store = AppleKeyStore::new(&config.apple)?;
        let apple = AppleSignIn::new(
            registry.clone(),
            Arc::new(AppleIdentityVerifier::new(key_store)),
            database.clone(),
            tokens.clone(),
        );

        let admin = AdminAuthorizer::new(config.admin.clone(), database.clone());
        let rate_limiter = AuthRateLimiter::new(
            config.http.auth_rate_limit_per_minute,
            config.http.trust_forwarded_for,
        );

        info!(
            tenants = registry.len(),
            plugins = ?plugins.ids(),
            "Server resources initialized"
        );

        Ok(Arc::new(Self {
            config: Arc::new(config),
            database,
            registry,
            tokens,
            passwords,
            apple,
            admin,
            rate_limiter,
            plugins: Arc::new(plugins),
        }))
    }
}
