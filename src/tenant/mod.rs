// ABOUTME: Multi-tenant support for many mobile apps sharing one backend
// ABOUTME: Exposes the immutable tenant registry and the request-scoped TenantScope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Multi-Tenant Architecture
//!
//! Every tenant is a distinct application. Tenants are declared once in a
//! JSON file, loaded into a [`TenantRegistry`] at startup, and never change
//! while the process runs.
//!
//! A [`TenantScope`] can only be minted by the registry, so holding one
//! proves the tenant exists. Every storage operation takes a scope and
//! filters by it.

/// Request-scoped tenant handle
pub mod context;
/// Tenant registry loaded from the apps configuration file
pub mod registry;

pub use context::TenantScope;
pub use registry::{RegistryLoadError, TenantConfig, TenantRegistry};
