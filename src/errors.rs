// ABOUTME: Re-exports the unified error types from the core crate
// ABOUTME: AppError, ErrorCode, AppResult, and the wire-level ErrorResponse
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling
//!
//! The error taxonomy lives in `unified-core` so it can be shared by every
//! crate in the workspace. This module re-exports it under the familiar path.

pub use unified_core::errors::{
    is_unique_violation, AppError, AppResult, ErrorCode, ErrorContext, ErrorResponse,
    ErrorResponseDetails, GENERIC_INTERNAL_MESSAGE,
};
