// ABOUTME: Main library entry point for the unified multi-tenant identity backend
// ABOUTME: Serves password and Apple sign-in, session tokens, and pluggable per-app features over HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Unified Backend
//!
//! One HTTP API shared by many independent mobile apps. Each app is a
//! tenant declared in a JSON registry file; users, refresh tokens, and
//! feature data never cross tenant boundaries.
//!
//! ## Features
//!
//! - **Password accounts**: register, login, account deletion
//! - **Apple Sign In**: identity token verification against Apple's published keys
//! - **Sessions**: short-lived JWT access tokens with rotating refresh tokens
//! - **Admin authorization**: static token, allow-lists, or per-tenant admin role
//! - **Feature plugins**: per-tenant routes and tables behind feature flags
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use unified_backend::config::ServerConfig;
//! use unified_backend::plugins::PluginRegistry;
//! use unified_backend::resources::ServerResources;
//! use unified_backend::tenant::TenantRegistry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let registry = TenantRegistry::load(&config.apps_config_path)?;
//!     let resources =
//!         ServerResources::new(config, registry, PluginRegistry::with_builtin_plugins()).await?;
//!     unified_backend::server::run(resources).await?;
//!     Ok(())
//! }
//! ```

/// Apple identity token verification and sign-in
pub mod apple;

/// Password accounts and session tokens
pub mod auth;

/// Environment-derived server configuration
pub mod config;

/// Tenant-scoped credential store
pub mod database;

/// Application error types
pub mod errors;

/// Structured logging setup and tenant-aware audit events
pub mod logging;

/// HTTP middleware: tenant scope, authentication, admin guard, rate limit, CORS
pub mod middleware;

/// Feature plugin system
pub mod plugins;

/// Shared server resources
pub mod resources;

/// HTTP route groups
pub mod routes;

/// Router assembly and serving
pub mod server;

/// Tenant registry and request scope
pub mod tenant;
