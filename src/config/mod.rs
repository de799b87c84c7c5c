// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Re-exports the environment-derived ServerConfig and its sections
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! Configuration is read once at startup into an explicit [`ServerConfig`]
//! and handed to the components that need it. Nothing reads the
//! environment after that.

/// Environment and server configuration
pub mod environment;

pub use environment::{AdminConfig, AppleConfig, AuthConfig, Environment, HttpConfig, ServerConfig};
