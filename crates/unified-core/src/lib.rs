// ABOUTME: Core types and constants for the unified multi-tenant identity backend
// ABOUTME: Foundation crate with error handling, domain models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Unified Core
//!
//! Foundation crate providing shared types and constants for the unified
//! backend. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **models**: Tenant-owned records (`User`, `RefreshTokenRecord`)
//! - **constants**: Header names, exempt paths, and identity-provider constants

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (User, RefreshTokenRecord, roles and providers)
pub mod models;
