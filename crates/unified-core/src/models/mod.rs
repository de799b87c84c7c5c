// ABOUTME: Core data models for tenant-owned identity records
// ABOUTME: Re-exports User, AuthProvider, UserRole, and RefreshTokenRecord
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! Every record here carries the identifier of the tenant that owns it.

mod refresh_token;
mod user;

pub use refresh_token::RefreshTokenRecord;
pub use user::{AuthProvider, User, UserRole};
