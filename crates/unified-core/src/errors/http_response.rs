// ABOUTME: Axum IntoResponse integration for AppError
// ABOUTME: Converts errors into JSON bodies and maps JSON body rejections to InvalidInput
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use tracing::{debug, error, warn};

use super::{AppError, ErrorResponse};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.code.is_server_error() {
            error!(
                code = ?self.code,
                tenant_id = self.context.tenant_id.as_deref().unwrap_or("-"),
                source = ?self.source,
                "{}",
                self.message
            );
        } else if status == StatusCode::FORBIDDEN {
            warn!(code = ?self.code, "{}", self.message);
        }

        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

/// Malformed request bodies are client errors with a fixed message
///
/// Parser detail stays in the debug log.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::JsonDataError(_) => "Request body has missing or invalid fields",
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
            JsonRejection::MissingJsonContentType(_) => {
                "Expected request with `Content-Type: application/json`"
            }
            _ => "Failed to read request body",
        };
        debug!(detail = %rejection.body_text(), "Rejected JSON request body");
        Self::invalid_input(message)
    }
}
