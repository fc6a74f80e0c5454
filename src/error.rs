// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::auth::error::{AuthError, ErrorBody};

/// Handler error. Auth failures keep their own code and status; everything
/// else is a plain status with a message.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Status {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(e) => e.status_code(),
            ApiError::Status { status, .. } => *status,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(e) => e.into_response(),
            ApiError::Status {
                status,
                code,
                message,
            } => {
                let body = ErrorBody {
                    success: false,
                    message,
                    code,
                    required: None,
                    actual: None,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status() {
        assert_eq!(ApiError::bad_request("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(AuthError::EmailAlreadyRegistered).status(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(
            body,
            r#"{"success":false,"message":"bad data","code":"VALIDATION_ERROR"}"#
        );
    }

    #[tokio::test]
    async fn internal_detail_is_not_returned() {
        let response = ApiError::from(AuthError::Internal("connection refused to db:5432".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert!(!body.contains("5432"));
        assert!(body.contains("INTERNAL_ERROR"));
    }
}
