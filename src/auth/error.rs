// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.
//!
//! Every variant maps to a fixed `code` string. Clients branch on the code,
//! so the codes are a wire contract and never carry library error text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Request body failed validation
    #[error("{0}")]
    Validation(String),
    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email is already registered")]
    EmailAlreadyRegistered,
    #[error("Account has been deactivated")]
    AccountDeactivated,
    /// Account exists but has no password credential
    #[error("This account uses single sign-on. Please log in with your identity provider")]
    UseFederatedLogin,
    #[error("Federated login failed")]
    FederatedLoginFailed,
    /// No usable `Authorization: Bearer` header
    #[error("Access token required")]
    TokenRequired,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Invalid token type")]
    WrongTokenKind,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("Refresh token has expired")]
    RefreshTokenExpired,
    #[error("Session expired due to inactivity")]
    InactivityTimeout,
    /// Refresh token points at a user that is gone or inactive
    #[error("User no longer valid")]
    UserInvalid,
    #[error("User not found")]
    UserNotFound,
    /// A guard ran without an authenticated principal
    #[error("Authentication required")]
    AuthRequired,
    #[error("Insufficient role")]
    InsufficientRole { required: Vec<String>, actual: String },
    #[error("Insufficient permissions")]
    InsufficientPermission {
        required: Vec<String>,
        actual: Vec<String>,
    },
    /// Ownership check failed; `required` lists the bypass roles
    #[error("Access denied")]
    AccessDenied { required: Vec<String>, actual: String },
    /// Store or crypto failure. The detail is logged, never returned.
    #[error("Internal authentication error: {0}")]
    Internal(String),
}

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<serde_json::Value>,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::EmailAlreadyRegistered => "EMAIL_EXISTS",
            AuthError::AccountDeactivated => "ACCOUNT_DEACTIVATED",
            AuthError::UseFederatedLogin => "USE_OAUTH_LOGIN",
            AuthError::FederatedLoginFailed => "OAUTH_FAILED",
            AuthError::TokenRequired => "TOKEN_REQUIRED",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::WrongTokenKind => "INVALID_TOKEN_TYPE",
            AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AuthError::RefreshTokenExpired => "REFRESH_TOKEN_EXPIRED",
            AuthError::InactivityTimeout => "SESSION_INACTIVE",
            AuthError::UserInvalid => "USER_INVALID",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::AuthRequired => "AUTH_REQUIRED",
            AuthError::InsufficientRole { .. } => "INSUFFICIENT_ROLE",
            AuthError::InsufficientPermission { .. } => "INSUFFICIENT_PERMISSIONS",
            AuthError::AccessDenied { .. } => "ACCESS_DENIED",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::UseFederatedLogin => StatusCode::BAD_REQUEST,
            AuthError::EmailAlreadyRegistered => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::AccountDeactivated
            | AuthError::FederatedLoginFailed
            | AuthError::TokenRequired
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::WrongTokenKind
            | AuthError::InvalidRefreshToken
            | AuthError::RefreshTokenExpired
            | AuthError::InactivityTimeout
            | AuthError::UserInvalid
            | AuthError::AuthRequired => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole { .. }
            | AuthError::InsufficientPermission { .. }
            | AuthError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the response body. Internal details are replaced by a generic message.
    pub fn body(&self) -> ErrorBody {
        let message = match self {
            AuthError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let (required, actual) = match self {
            AuthError::InsufficientRole { required, actual }
            | AuthError::AccessDenied { required, actual } => {
                (Some(serde_json::json!(required)), Some(serde_json::json!(actual)))
            }
            AuthError::InsufficientPermission { required, actual } => {
                (Some(serde_json::json!(required)), Some(serde_json::json!(actual)))
            }
            _ => (None, None),
        };
        ErrorBody {
            success: false,
            message,
            code: self.error_code(),
            required,
            actual,
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(e: StorageError) -> Self {
        tracing::error!(error = %e, "credential store operation failed");
        AuthError::Internal(e.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}
