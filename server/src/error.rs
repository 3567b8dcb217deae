// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::{FieldError, ValidationFailure};
use serde_json::json;

use crate::auth::AuthError;

/// Our custom error type for the application.
///
/// Rendered as `{ "success": false, "message": ..., "errors": [...] }`;
/// `errors` is only present for validation failures.
#[derive(Debug)]
pub struct AppError {
    pub code: StatusCode,
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl AppError {
    pub fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            errors: Vec::new(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Used both for missing ids and ids owned by someone else.
    pub fn task_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Task not found")
    }
}

impl From<ValidationFailure> for AppError {
    fn from(failure: ValidationFailure) -> Self {
        Self {
            code: StatusCode::BAD_REQUEST,
            message: failure.to_string(),
            errors: failure.errors,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, &rejection.body_text())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self::new(err.status_code(), &err.to_string())
    }
}

/// Allows converting an `anyhow::Error` (coming from `database.rs`)
/// into our `AppError`. The details stay in the logs.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Internal server error: {:?}", err);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An internal error occurred.",
        )
    }
}

/// Allows Axum to convert our `AppError` into an HTTP `Response`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.code.is_server_error() {
            tracing::error!(
                "Responding with error: status_code={}, message={}",
                self.code.as_u16(),
                self.message
            );
        } else {
            tracing::debug!(
                "Responding with error: status_code={}, message={}",
                self.code.as_u16(),
                self.message
            );
        }

        let body = if self.errors.is_empty() {
            json!({ "success": false, "message": self.message })
        } else {
            json!({ "success": false, "message": self.message, "errors": self.errors })
        };
        (self.code, Json(body)).into_response()
    }
}
