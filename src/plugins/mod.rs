// ABOUTME: Feature plugin system for tenant-aware extensions of the identity core
// ABOUTME: Plugins add tables, user and admin routes, and take part in account deletion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Plugin System
//!
//! A [`FeaturePlugin`] contributes:
//! - schema migrations and per-tenant seed data
//! - tables purged when an account is deleted
//! - user routes under `/api` and admin routes under `/api/admin`
//!
//! Routes of a plugin with a required feature answer 404 to tenants that do
//! not enable the flag in their registry entry.

pub mod core;
pub mod registry;
/// Built-in per-tenant remote configuration
pub mod remote_config;

pub use self::core::{FeaturePlugin, PluginContext, PluginRoutes};
pub use registry::PluginRegistry;
pub use remote_config::RemoteConfigPlugin;
