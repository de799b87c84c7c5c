// ABOUTME: Route module organization for the identity backend HTTP endpoints
// ABOUTME: Groups core routes by domain; plugin routes are mounted by the plugin registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module
//!
//! Each domain module contains only route definitions and thin handler
//! functions that delegate to the authenticators and stores.

/// Authentication routes
pub mod auth;
/// Health check route
pub mod health;
/// JSON body extractor
pub mod json;
/// Legal document routes
pub mod legal;

/// Authentication route handlers
pub use auth::AuthRoutes;
/// Health route handlers
pub use health::{HealthResponse, HealthRoutes};
/// JSON body extractor with unified rejections
pub use json::AppJson;
/// Legal route handlers
pub use legal::LegalRoutes;
