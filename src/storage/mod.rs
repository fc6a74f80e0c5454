// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Store
//!
//! Contract between the auth core and the record store holding users and
//! refresh tokens. The production deployment backs this with the hosted
//! Postgres database; [`InMemoryStore`] implements the same contract for
//! local runs and tests.
//!
//! ## Guarantees required from implementations
//!
//! - Email lookups are case-insensitive and `insert_user` rejects duplicates
//!   with [`StorageError::AlreadyExists`].
//! - [`CredentialStore::claim_refresh_token`] is atomic: of any number of
//!   concurrent calls with the same hash, at most one returns the record.
//! - Revocation flips the `revoked` flag; records are never deleted here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory;
pub mod records;

pub use memory::InMemoryStore;
pub use records::{NewUser, RefreshTokenRecord, UserChanges, UserRecord};

/// Error type for credential store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    /// Transport or database failure reported by the backing store
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>>;

    async fn find_user_by_id(&self, id: &str) -> StorageResult<Option<UserRecord>>;

    async fn find_user_by_federated_id(&self, federated_id: &str)
        -> StorageResult<Option<UserRecord>>;

    async fn insert_user(&self, user: NewUser) -> StorageResult<UserRecord>;

    /// Apply `changes` and return the updated row.
    async fn update_user(&self, id: &str, changes: UserChanges) -> StorageResult<UserRecord>;

    async fn insert_refresh_token_record(
        &self,
        user_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<RefreshTokenRecord>;

    async fn find_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> StorageResult<Option<RefreshTokenRecord>>;

    /// Revoke one record by id. Revoking an already revoked record is a no-op.
    async fn revoke_refresh_token_record(&self, id: &str) -> StorageResult<()>;

    /// Atomically revoke the non-revoked record with `token_hash` and return
    /// it as it was before revocation. Returns `None` if no such record
    /// exists or it was already revoked.
    async fn claim_refresh_token(&self, token_hash: &str)
        -> StorageResult<Option<RefreshTokenRecord>>;

    /// Revoke every non-revoked record of the user in one operation.
    /// Returns how many records were revoked.
    async fn revoke_all_refresh_tokens_for_user(&self, user_id: &str) -> StorageResult<usize>;
}
