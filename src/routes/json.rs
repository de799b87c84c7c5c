// ABOUTME: JSON body extractor whose rejections use the unified error body
// ABOUTME: Missing fields and malformed JSON become 400 INVALID_INPUT instead of axum's plain text
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::AppError;
use axum::extract::FromRequest;
use axum::Json;

/// `Json<T>` with [`AppError`] as its rejection
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
