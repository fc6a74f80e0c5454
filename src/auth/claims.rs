// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated principal.

use serde::{Deserialize, Serialize};

use super::permissions::{Permission, PermissionSet};
use super::roles::Role;
use crate::storage::UserRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID
    pub sub: String,
    pub email: String,
    pub role: String,
    pub permissions: PermissionSet,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Last activity marker (Unix milliseconds) used for inactivity checks
    pub last_activity: i64,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User ID
    pub sub: String,
    /// Random token identifier, makes every issued token unique
    pub jti: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Decoded token payload, discriminated by the `kind` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TokenClaims {
    Access(AccessClaims),
    Refresh(RefreshClaims),
}

impl TokenClaims {
    pub fn kind(&self) -> TokenKind {
        match self {
            TokenClaims::Access(_) => TokenKind::Access,
            TokenClaims::Refresh(_) => TokenKind::Refresh,
        }
    }
}

/// Authenticated principal attached to a request by the request gate.
///
/// Identity comes from the token; role and permissions come from the user
/// record fetched for this request, so role changes and deactivations apply
/// immediately.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub avatar_url: Option<String>,
    pub permissions: PermissionSet,
    pub claims: AccessClaims,
}

impl AuthenticatedUser {
    /// Build the principal from a freshly fetched user and the verified claims.
    pub fn new(user: &UserRecord, claims: AccessClaims) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
            avatar_url: user.avatar_url.clone(),
            permissions: super::permissions::permissions_for(&user.role),
            claims,
        }
    }

    /// Parsed role, `None` if the stored role is unknown.
    pub fn known_role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    /// Check if the user's role is at or above `required`.
    pub fn has_role(&self, required: Role) -> bool {
        self.known_role().is_some_and(|role| role.is_at_least(required))
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::Utc;

    pub fn user_record(id: &str, role: Role) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            password_hash: None,
            full_name: "Fixture User".to_string(),
            role: role.to_string(),
            is_active: true,
            federated_id: None,
            avatar_url: None,
            email_verified: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn principal(id: &str, role: Role) -> AuthenticatedUser {
        let user = user_record(id, role);
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            permissions: role.permission_set(),
            iss: "test".to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + 900,
            last_activity: now.timestamp_millis(),
        };
        AuthenticatedUser::new(&user, claims)
    }
}
