// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive `ToSchema`
//! for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Auth requests**: registration, login, refresh, logout, password change
//! - **Auth responses**: issued tokens with the caller's profile and permissions
//! - **Users**: public profile and status changes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthenticatedUser, Permission, PermissionSet, Role};
use crate::storage::UserRecord;

// =============================================================================
// Auth Requests
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh token may come in the body or in the `refresh_token` cookie.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// =============================================================================
// Users
// =============================================================================

/// User profile as returned to clients. Never carries credentials.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    /// Stored role name
    pub role: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    /// Whether the account can log in with a password
    pub has_password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
            is_active: user.is_active,
            avatar_url: user.avatar_url.clone(),
            email_verified: user.email_verified,
            has_password: user.password_hash.is_some(),
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateUserStatusRequest {
    pub is_active: bool,
}

// =============================================================================
// Auth Responses
// =============================================================================

/// Returned by register, login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserProfile,
    pub access_token: String,
    /// Also set as an HttpOnly cookie
    pub refresh_token: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
    #[schema(value_type = Vec<Permission>)]
    pub permissions: PermissionSet,
}

/// Current principal.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub success: bool,
    pub user: MeUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[schema(value_type = Vec<Permission>)]
    pub permissions: PermissionSet,
}

impl From<AuthenticatedUser> for MeUser {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            id: user.user_id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            avatar_url: user.avatar_url,
            permissions: user.permissions,
        }
    }
}

/// Catalog view for the caller. Anonymous callers get no role and no permissions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[schema(value_type = Vec<Permission>)]
    pub permissions: PermissionSet,
    /// Roles from lowest to highest privilege
    pub hierarchy: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::fixtures::user_record;

    #[test]
    fn profile_never_exposes_the_password_hash() {
        let mut user = user_record("user_1", Role::Employee);
        user.password_hash = Some("$2b$04$abcdefghijklmnopqrstuv".to_string());

        let profile = UserProfile::from(&user);
        assert!(profile.has_password);

        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("$2b$"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn refresh_request_accepts_empty_body_object() {
        let request: RefreshRequest = serde_json::from_str("{}").unwrap();
        assert!(request.refresh_token.is_none());
    }
}
