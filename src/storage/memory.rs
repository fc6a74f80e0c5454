// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory credential store.
//!
//! Both tables live behind a single lock so that multi-row operations
//! (claiming a refresh token, revoking a user's tokens) are atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CredentialStore, NewUser, RefreshTokenRecord, StorageError, StorageResult, UserChanges,
    UserRecord,
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, UserRecord>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refresh token records (revoked or not) owned by a user.
    pub async fn refresh_token_count(&self, user_id: &str) -> usize {
        self.tables
            .read()
            .await
            .refresh_tokens
            .values()
            .filter(|record| record.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> StorageResult<Option<UserRecord>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_federated_id(
        &self,
        federated_id: &str,
    ) -> StorageResult<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.federated_id.as_deref() == Some(federated_id))
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StorageResult<UserRecord> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StorageError::AlreadyExists(format!("User {}", user.email)));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            role: user.role.to_string(),
            is_active: true,
            federated_id: user.federated_id,
            avatar_url: user.avatar_url,
            email_verified: user.email_verified,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_user(&self, id: &str, changes: UserChanges) -> StorageResult<UserRecord> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("User {id}")))?;

        if let Some(hash) = changes.password_hash {
            user.password_hash = Some(hash);
        }
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(role) = changes.role {
            user.role = role.to_string();
        }
        if let Some(active) = changes.is_active {
            user.is_active = active;
        }
        if let Some(federated_id) = changes.federated_id {
            user.federated_id = Some(federated_id);
        }
        if let Some(avatar_url) = changes.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        if let Some(verified) = changes.email_verified {
            user.email_verified = verified;
        }
        if let Some(at) = changes.last_login_at {
            user.last_login_at = Some(at);
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn insert_refresh_token_record(
        &self,
        user_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<RefreshTokenRecord> {
        let mut tables = self.tables.write().await;

        if tables
            .refresh_tokens
            .values()
            .any(|record| record.token_hash == token_hash)
        {
            return Err(StorageError::AlreadyExists("Refresh token".to_string()));
        }

        let record = RefreshTokenRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token_hash: token_hash.to_string(),
            expires_at,
            revoked: false,
            created_at: Utc::now(),
        };
        tables
            .refresh_tokens
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> StorageResult<Option<RefreshTokenRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .refresh_tokens
            .values()
            .find(|record| record.token_hash == token_hash)
            .cloned())
    }

    async fn revoke_refresh_token_record(&self, id: &str) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        match tables.refresh_tokens.get_mut(id) {
            Some(record) => {
                record.revoked = true;
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("Refresh token {id}"))),
        }
    }

    async fn claim_refresh_token(
        &self,
        token_hash: &str,
    ) -> StorageResult<Option<RefreshTokenRecord>> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables
            .refresh_tokens
            .values_mut()
            .find(|record| record.token_hash == token_hash && !record.revoked)
        else {
            return Ok(None);
        };

        let claimed = record.clone();
        record.revoked = true;
        Ok(Some(claimed))
    }

    async fn revoke_all_refresh_tokens_for_user(&self, user_id: &str) -> StorageResult<usize> {
        let mut tables = self.tables.write().await;
        let mut revoked = 0;
        for record in tables
            .refresh_tokens
            .values_mut()
            .filter(|record| record.user_id == user_id && !record.revoked)
        {
            record.revoked = true;
            revoked += 1;
        }
        Ok(revoked)
    }
}
