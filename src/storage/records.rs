// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Records persisted by the credential store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// User row as held by the credential store.
///
/// `role` is kept as the raw stored string. Rows written by other tools may
/// carry a role this service does not know; such users resolve to an empty
/// permission set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    /// Normalized (lowercase) email
    pub email: String,
    /// bcrypt hash; `None` for federated-only accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub federated_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new user row. The store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub full_name: String,
    pub role: Role,
    pub federated_id: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
}

/// Partial update of a user row. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub federated_id: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: Option<bool>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Persisted refresh token. Only the hash of the token is ever stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
