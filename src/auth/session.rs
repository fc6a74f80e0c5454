// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session manager: registration, logins, refresh rotation and logout.
//!
//! ## Session lifecycle
//!
//! ```text
//! Unauthenticated --register/login/federated--> Authenticated(access, refresh)
//! Authenticated   --refresh--> Authenticated(new access, new refresh)
//! Authenticated   --logout / logout_all--> Unauthenticated
//! ```
//!
//! Every refresh-token record is created by [`SessionManager::generate_token_pair`],
//! so each persisted hash has exactly one raw token handed to a client.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};
use unicode_normalization::UnicodeNormalization;

use super::error::AuthError;
use super::password::{
    hash_password, validate_email, validate_full_name, validate_password, verify_password,
};
use super::roles::Role;
use super::token::TokenCodec;
use crate::storage::{CredentialStore, NewUser, StorageError, UserChanges, UserRecord};

/// Access and refresh token handed to a client.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Result of every successful authentication.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: UserRecord,
    pub tokens: TokenPair,
}

/// Verified identity handed over by the external OAuth flow.
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedProfile {
    pub email: Option<String>,
    pub federated_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Normalize an email for storage and lookup: NFKC, trimmed, lowercase.
pub fn normalize_email(email: &str) -> String {
    email.nfkc().collect::<String>().trim().to_lowercase()
}

const DUMMY_PASSWORD: &str = "timing-equalizer-0";

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenCodec>,
    bcrypt_cost: u32,
    dummy_hash: OnceCell<String>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenCodec>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            store,
            tokens,
            bcrypt_cost,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Create a password account with the default role and sign it in.
    #[instrument(skip(self, password, full_name), fields(email = %email))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthSession, AuthError> {
        self.create_password_account(email, password, full_name, Role::DEFAULT)
            .await
    }

    /// Create a password account with an explicit role and sign it in.
    ///
    /// Used for registration and for the bootstrap administrator.
    #[instrument(skip(self, password, full_name), fields(email = %email, role = %role))]
    pub async fn create_password_account(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);
        validate_email(&email)?;
        validate_password(password)?;
        let full_name = validate_full_name(full_name)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password(password, self.bcrypt_cost).await?;
        let user = self
            .store
            .insert_user(NewUser {
                email,
                password_hash: Some(password_hash),
                full_name,
                role,
                federated_id: None,
                avatar_url: None,
                email_verified: false,
            })
            .await
            .map_err(|e| match e {
                // lost a race with a concurrent registration
                StorageError::AlreadyExists(_) => AuthError::EmailAlreadyRegistered,
                other => other.into(),
            })?;

        info!(user_id = %user.id, "registered new user");
        let tokens = self.generate_token_pair(&user).await?;
        Ok(AuthSession { user, tokens })
    }

    /// Password login.
    ///
    /// Unknown email and wrong password produce the same error so callers
    /// cannot probe which accounts exist.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            verify_password(password, self.dummy_hash().await?).await?;
            warn!("login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active {
            warn!(user_id = %user.id, "login refused: account deactivated");
            return Err(AuthError::AccountDeactivated);
        }

        let Some(stored_hash) = user.password_hash.as_deref() else {
            return Err(AuthError::UseFederatedLogin);
        };

        if !verify_password(password, stored_hash).await? {
            warn!(user_id = %user.id, "login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .update_user(
                &user.id,
                UserChanges {
                    last_login_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id = %user.id, "user logged in");
        let tokens = self.generate_token_pair(&user).await?;
        Ok(AuthSession { user, tokens })
    }

    /// Sign in with an identity verified by an external provider.
    ///
    /// Links the federated id to an existing account matched by federated id
    /// or email, or creates a new verified account without a password.
    #[instrument(skip(self, profile), fields(federated_id = %profile.federated_id))]
    pub async fn handle_federated_login(
        &self,
        profile: FederatedProfile,
    ) -> Result<AuthSession, AuthError> {
        let email = profile
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                warn!("federated profile carries no email");
                AuthError::FederatedLoginFailed
            })?;
        if profile.federated_id.trim().is_empty() {
            warn!("federated profile carries no identifier");
            return Err(AuthError::FederatedLoginFailed);
        }

        let user = match self.find_federated_match(&profile.federated_id, &email).await? {
            Some(user) => self.link_federated(user, &profile).await?,
            None => {
                let full_name = profile
                    .display_name
                    .as_deref()
                    .and_then(|name| validate_full_name(name).ok())
                    .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

                let inserted = self
                    .store
                    .insert_user(NewUser {
                        email: email.clone(),
                        password_hash: None,
                        full_name,
                        role: Role::DEFAULT,
                        federated_id: Some(profile.federated_id.clone()),
                        avatar_url: profile.avatar_url.clone(),
                        email_verified: true,
                    })
                    .await;

                match inserted {
                    Ok(created) => {
                        let created = self
                            .store
                            .update_user(
                                &created.id,
                                UserChanges {
                                    last_login_at: Some(Utc::now()),
                                    ..Default::default()
                                },
                            )
                            .await?;
                        info!(user_id = %created.id, "created user from federated login");
                        created
                    }
                    // lost a race with a concurrent sign-in for the same identity
                    Err(StorageError::AlreadyExists(_)) => {
                        let winner = self
                            .find_federated_match(&profile.federated_id, &email)
                            .await?
                            .ok_or(AuthError::FederatedLoginFailed)?;
                        self.link_federated(winner, &profile).await?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let tokens = self.generate_token_pair(&user).await?;
        Ok(AuthSession { user, tokens })
    }

    /// Exchange a refresh token for a new pair. The presented token is
    /// revoked in the same store operation that looks it up, so it can be
    /// used at most once even under concurrent requests.
    #[instrument(skip_all)]
    pub async fn refresh(&self, raw_refresh_token: &str) -> Result<AuthSession, AuthError> {
        let claims = self
            .tokens
            .verify_refresh(raw_refresh_token)
            .map_err(|e| match e {
                AuthError::TokenExpired => AuthError::RefreshTokenExpired,
                _ => AuthError::InvalidRefreshToken,
            })?;

        let token_hash = TokenCodec::hash_token(raw_refresh_token);
        let Some(record) = self.store.claim_refresh_token(&token_hash).await? else {
            warn!(user_id = %claims.sub, "refresh token unknown or already used");
            return Err(AuthError::InvalidRefreshToken);
        };

        if record.user_id != claims.sub {
            warn!(
                user_id = %claims.sub,
                record_owner = %record.user_id,
                "refresh token subject mismatch"
            );
            return Err(AuthError::InvalidRefreshToken);
        }

        if record.is_expired_at(Utc::now()) {
            return Err(AuthError::RefreshTokenExpired);
        }

        let user = match self.store.find_user_by_id(&record.user_id).await? {
            Some(user) if user.is_active => user,
            _ => {
                warn!(user_id = %record.user_id, "refresh refused: user missing or inactive");
                return Err(AuthError::UserInvalid);
            }
        };

        let tokens = self.generate_token_pair(&user).await?;
        Ok(AuthSession { user, tokens })
    }

    /// Revoke the given refresh token if it belongs to the user.
    /// Unknown, foreign or already revoked tokens are ignored.
    #[instrument(skip(self, raw_refresh_token))]
    pub async fn logout(
        &self,
        user_id: &str,
        raw_refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let Some(raw) = raw_refresh_token.filter(|t| !t.is_empty()) else {
            return Ok(());
        };

        let token_hash = TokenCodec::hash_token(raw);
        if let Some(record) = self.store.find_refresh_token_by_hash(&token_hash).await? {
            if record.user_id == user_id && !record.revoked {
                self.store.revoke_refresh_token_record(&record.id).await?;
            }
        }

        info!("user logged out");
        Ok(())
    }

    /// Revoke every refresh token of the user.
    #[instrument(skip(self))]
    pub async fn logout_all(&self, user_id: &str) -> Result<(), AuthError> {
        let revoked = self
            .store
            .revoke_all_refresh_tokens_for_user(user_id)
            .await?;
        info!(revoked, "revoked all sessions");
        Ok(())
    }

    /// Replace the password after checking the current one, then end every
    /// other session.
    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let Some(stored_hash) = user.password_hash.as_deref() else {
            return Err(AuthError::UseFederatedLogin);
        };
        if !verify_password(current_password, stored_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(new_password)?;

        let password_hash = hash_password(new_password, self.bcrypt_cost).await?;
        self.store
            .update_user(
                user_id,
                UserChanges {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;
        self.logout_all(user_id).await?;

        info!("password changed");
        Ok(())
    }

    /// Activate or deactivate an account. Deactivation ends all sessions.
    #[instrument(skip(self))]
    pub async fn set_active(&self, user_id: &str, active: bool) -> Result<UserRecord, AuthError> {
        let user = self
            .store
            .update_user(
                user_id,
                UserChanges {
                    is_active: Some(active),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => AuthError::UserNotFound,
                other => other.into(),
            })?;

        if !active {
            self.logout_all(user_id).await?;
        }
        info!(active, "account status changed");
        Ok(user)
    }

    /// Existing account for a federated identity: by federated id, then by email.
    async fn find_federated_match(
        &self,
        federated_id: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        match self.store.find_user_by_federated_id(federated_id).await? {
            Some(user) => Ok(Some(user)),
            None => Ok(self.store.find_user_by_email(email).await?),
        }
    }

    async fn link_federated(
        &self,
        user: UserRecord,
        profile: &FederatedProfile,
    ) -> Result<UserRecord, AuthError> {
        if !user.is_active {
            warn!(user_id = %user.id, "federated login refused: account deactivated");
            return Err(AuthError::AccountDeactivated);
        }
        let linked = self
            .store
            .update_user(
                &user.id,
                UserChanges {
                    federated_id: Some(profile.federated_id.clone()),
                    avatar_url: profile.avatar_url.clone(),
                    email_verified: Some(true),
                    last_login_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %linked.id, "federated login for existing user");
        Ok(linked)
    }

    /// Bcrypt hash of a throwaway password, verified against on unknown
    /// emails so both login failures cost one bcrypt round.
    async fn dummy_hash(&self) -> Result<&str, AuthError> {
        self.dummy_hash
            .get_or_try_init(|| hash_password(DUMMY_PASSWORD, self.bcrypt_cost))
            .await
            .map(String::as_str)
    }

    /// Issue an access/refresh pair and persist the refresh token hash.
    pub(crate) async fn generate_token_pair(
        &self,
        user: &UserRecord,
    ) -> Result<TokenPair, AuthError> {
        let permissions = super::permissions::permissions_for(&user.role);
        let access_token = self.tokens.issue_access_token(user, &permissions)?;
        let refresh = self.tokens.issue_refresh_token(user)?;

        self.store
            .insert_refresh_token_record(&user.id, &refresh.token_hash, refresh.expires_at)
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::{permissions_for, PermissionSet};
    use crate::auth::token::test_settings::auth_settings;
    use crate::storage::InMemoryStore;
    use chrono::TimeDelta;

    struct Harness {
        store: Arc<InMemoryStore>,
        tokens: Arc<TokenCodec>,
        sessions: SessionManager,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let tokens = Arc::new(TokenCodec::new(&auth_settings()).unwrap());
        let sessions = SessionManager::new(store.clone(), tokens.clone(), 4);
        Harness {
            store,
            tokens,
            sessions,
        }
    }

    fn profile(email: Option<&str>, federated_id: &str) -> FederatedProfile {
        FederatedProfile {
            email: email.map(str::to_string),
            federated_id: federated_id.to_string(),
            display_name: Some("Fed User".to_string()),
            avatar_url: Some("https://img.example.com/a.png".to_string()),
        }
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        // fullwidth characters fold under NFKC
        assert_eq!(normalize_email("ａｌｉｃｅ@example.com"), "alice@example.com");
    }

    #[tokio::test]
    async fn register_then_login_yields_role_permissions() {
        let h = harness();
        let registered = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        assert_eq!(registered.user.role, "employee");
        assert_ne!(registered.user.password_hash.as_deref(), Some("Secret123"));

        let session = h.sessions.login("ALICE@example.com", "Secret123").await.unwrap();
        assert!(session.user.last_login_at.is_some());

        let claims = h.tokens.verify_access(&session.tokens.access_token).unwrap();
        assert_eq!(claims.sub, registered.user.id);
        assert_eq!(claims.permissions, permissions_for(&session.user.role));
        assert_eq!(claims.permissions.len(), 9);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let h = harness();
        h.sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        let err = h
            .sessions
            .register("Alice@Example.com", "Secret456", "Alice Again")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailAlreadyRegistered));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_storage() {
        let h = harness();
        for (email, password, name) in [
            ("not-an-email", "Secret123", "A"),
            ("bob@example.com", "short", "Bob"),
            ("bob@example.com", "Secret123", "  "),
        ] {
            let err = h.sessions.register(email, password, name).await.unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)));
        }
        assert!(h.store.find_user_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_indistinguishable() {
        let h = harness();
        h.sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();

        let wrong = h.sessions.login("alice@example.com", "Wrong1234").await.unwrap_err();
        let unknown = h.sessions.login("nobody@example.com", "Secret123").await.unwrap_err();

        assert_eq!(wrong.error_code(), unknown.error_code());
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.status_code(), unknown.status_code());
        assert!(matches!(wrong, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in() {
        let h = harness();
        let session = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        h.sessions.set_active(&session.user.id, false).await.unwrap();

        let err = h.sessions.login("alice@example.com", "Secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDeactivated));
    }

    #[tokio::test]
    async fn federated_only_account_must_use_federated_login() {
        let h = harness();
        h.sessions
            .handle_federated_login(profile(Some("fed@example.com"), "g-1"))
            .await
            .unwrap();

        let err = h.sessions.login("fed@example.com", "Secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::UseFederatedLogin));
    }

    #[tokio::test]
    async fn federated_login_creates_verified_employee() {
        let h = harness();
        let session = h
            .sessions
            .handle_federated_login(profile(Some("New@Example.com"), "g-42"))
            .await
            .unwrap();

        assert_eq!(session.user.email, "new@example.com");
        assert_eq!(session.user.role, "employee");
        assert!(session.user.email_verified);
        assert!(session.user.password_hash.is_none());
        assert_eq!(session.user.federated_id.as_deref(), Some("g-42"));
        assert!(session.user.last_login_at.is_some());
        assert_eq!(session.user.full_name, "Fed User");
    }

    #[tokio::test]
    async fn federated_login_links_existing_account_idempotently() {
        let h = harness();
        let registered = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();

        let first = h
            .sessions
            .handle_federated_login(profile(Some("alice@example.com"), "g-7"))
            .await
            .unwrap();
        let second = h
            .sessions
            .handle_federated_login(profile(Some("alice@example.com"), "g-7"))
            .await
            .unwrap();

        assert_eq!(first.user.id, registered.user.id);
        assert_eq!(second.user.id, registered.user.id);
        assert_eq!(second.user.federated_id.as_deref(), Some("g-7"));
        assert!(second.user.email_verified);
        // the password credential survives linking
        assert!(second.user.password_hash.is_some());
        assert!(h.sessions.login("alice@example.com", "Secret123").await.is_ok());
    }

    #[tokio::test]
    async fn federated_login_without_email_fails() {
        let h = harness();
        let err = h
            .sessions
            .handle_federated_login(profile(None, "g-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::FederatedLoginFailed));
    }

    #[tokio::test]
    async fn federated_display_name_is_bounded() {
        let h = harness();
        let mut long_name = profile(Some("new@example.com"), "g-5");
        long_name.display_name = Some("x".repeat(150));

        let session = h.sessions.handle_federated_login(long_name).await.unwrap();
        assert_eq!(session.user.full_name, "new");
    }

    /// Delegates to the in-memory store, but the first email lookup misses
    /// as if a concurrent request inserted the user right after it.
    struct StaleEmailLookup {
        inner: InMemoryStore,
        missed: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl CredentialStore for StaleEmailLookup {
        async fn find_user_by_email(
            &self,
            email: &str,
        ) -> crate::storage::StorageResult<Option<UserRecord>> {
            if !self.missed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_user_by_email(email).await
        }

        async fn find_user_by_id(
            &self,
            id: &str,
        ) -> crate::storage::StorageResult<Option<UserRecord>> {
            self.inner.find_user_by_id(id).await
        }

        async fn find_user_by_federated_id(
            &self,
            federated_id: &str,
        ) -> crate::storage::StorageResult<Option<UserRecord>> {
            self.inner.find_user_by_federated_id(federated_id).await
        }

        async fn insert_user(&self, user: NewUser) -> crate::storage::StorageResult<UserRecord> {
            self.inner.insert_user(user).await
        }

        async fn update_user(
            &self,
            id: &str,
            changes: UserChanges,
        ) -> crate::storage::StorageResult<UserRecord> {
            self.inner.update_user(id, changes).await
        }

        async fn insert_refresh_token_record(
            &self,
            user_id: &str,
            token_hash: &str,
            expires_at: DateTime<Utc>,
        ) -> crate::storage::StorageResult<crate::storage::RefreshTokenRecord> {
            self.inner
                .insert_refresh_token_record(user_id, token_hash, expires_at)
                .await
        }

        async fn find_refresh_token_by_hash(
            &self,
            token_hash: &str,
        ) -> crate::storage::StorageResult<Option<crate::storage::RefreshTokenRecord>> {
            self.inner.find_refresh_token_by_hash(token_hash).await
        }

        async fn revoke_refresh_token_record(&self, id: &str) -> crate::storage::StorageResult<()> {
            self.inner.revoke_refresh_token_record(id).await
        }

        async fn claim_refresh_token(
            &self,
            token_hash: &str,
        ) -> crate::storage::StorageResult<Option<crate::storage::RefreshTokenRecord>> {
            self.inner.claim_refresh_token(token_hash).await
        }

        async fn revoke_all_refresh_tokens_for_user(
            &self,
            user_id: &str,
        ) -> crate::storage::StorageResult<usize> {
            self.inner.revoke_all_refresh_tokens_for_user(user_id).await
        }
    }

    #[tokio::test]
    async fn federated_insert_race_links_the_winning_account() {
        let store = Arc::new(StaleEmailLookup {
            inner: InMemoryStore::new(),
            missed: std::sync::atomic::AtomicBool::new(true),
        });
        let tokens = Arc::new(TokenCodec::new(&auth_settings()).unwrap());
        let sessions = SessionManager::new(store.clone(), tokens, 4);

        let winner = sessions
            .register("race@example.com", "Secret123", "Racer")
            .await
            .unwrap();
        store.missed.store(false, std::sync::atomic::Ordering::SeqCst);

        let session = sessions
            .handle_federated_login(profile(Some("race@example.com"), "g-race"))
            .await
            .unwrap();
        assert_eq!(session.user.id, winner.user.id);
        assert_eq!(session.user.federated_id.as_deref(), Some("g-race"));
    }

    #[tokio::test]
    async fn unknown_email_still_runs_a_bcrypt_verification() {
        let h = harness();
        assert!(h.sessions.dummy_hash.get().is_none());

        let err = h.sessions.login("nobody@example.com", "Secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        let dummy = h.sessions.dummy_hash.get().unwrap();
        assert!(dummy.starts_with("$2"));
    }

    #[tokio::test]
    async fn refresh_rotates_and_is_single_use() {
        let h = harness();
        let session = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        let r1 = session.tokens.refresh_token;

        let rotated = h.sessions.refresh(&r1).await.unwrap();
        assert_ne!(rotated.tokens.refresh_token, r1);
        assert_eq!(rotated.user.id, session.user.id);

        let replay = h.sessions.refresh(&r1).await.unwrap_err();
        assert!(matches!(replay, AuthError::InvalidRefreshToken));

        // the successor still works
        assert!(h.sessions.refresh(&rotated.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_refresh_issues_one_successor() {
        let h = harness();
        let session = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        let r1 = session.tokens.refresh_token;

        let (a, b) = tokio::join!(h.sessions.refresh(&r1), h.sessions.refresh(&r1));
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn expired_unrevoked_record_reports_expiry() {
        let h = harness();
        let session = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();

        // token itself is still valid, the stored record is not
        let issued = h.tokens.issue_refresh_token(&session.user).unwrap();
        h.store
            .insert_refresh_token_record(
                &session.user.id,
                &issued.token_hash,
                Utc::now() - TimeDelta::minutes(5),
            )
            .await
            .unwrap();

        let err = h.sessions.refresh(&issued.token).await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshTokenExpired));
    }

    #[tokio::test]
    async fn expired_refresh_jwt_reports_expiry() {
        let h = harness();
        let session = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        let issued = h
            .tokens
            .issue_refresh_token_at(&session.user, Utc::now() - TimeDelta::days(8))
            .unwrap();

        let err = h.sessions.refresh(&issued.token).await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshTokenExpired));
    }

    #[tokio::test]
    async fn unpersisted_or_access_tokens_are_invalid_refresh_tokens() {
        let h = harness();
        let session = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();

        let orphan = h.tokens.issue_refresh_token(&session.user).unwrap();
        assert!(matches!(
            h.sessions.refresh(&orphan.token).await.unwrap_err(),
            AuthError::InvalidRefreshToken
        ));
        assert!(matches!(
            h.sessions.refresh(&session.tokens.access_token).await.unwrap_err(),
            AuthError::InvalidRefreshToken
        ));
        assert!(matches!(
            h.sessions.refresh("garbage").await.unwrap_err(),
            AuthError::InvalidRefreshToken
        ));
    }

    #[tokio::test]
    async fn refresh_for_deactivated_user_is_user_invalid() {
        let h = harness();
        let session = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        // deactivate directly so the refresh record stays live
        h.store
            .update_user(
                &session.user.id,
                UserChanges {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = h.sessions.refresh(&session.tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::UserInvalid));
    }

    #[tokio::test]
    async fn logout_revokes_only_the_given_token() {
        let h = harness();
        let first = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        let second = h.sessions.login("alice@example.com", "Secret123").await.unwrap();

        h.sessions
            .logout(&first.user.id, Some(&first.tokens.refresh_token))
            .await
            .unwrap();
        // idempotent
        h.sessions
            .logout(&first.user.id, Some(&first.tokens.refresh_token))
            .await
            .unwrap();
        h.sessions.logout(&first.user.id, None).await.unwrap();

        assert!(h.sessions.refresh(&first.tokens.refresh_token).await.is_err());
        assert!(h.sessions.refresh(&second.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn logout_ignores_tokens_of_other_users() {
        let h = harness();
        let alice = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        let bob = h
            .sessions
            .register("bob@example.com", "Secret123", "Bob")
            .await
            .unwrap();

        h.sessions
            .logout(&bob.user.id, Some(&alice.tokens.refresh_token))
            .await
            .unwrap();
        assert!(h.sessions.refresh(&alice.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn logout_all_kills_every_refresh_token() {
        let h = harness();
        let first = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        let second = h.sessions.login("alice@example.com", "Secret123").await.unwrap();
        let third = h.sessions.login("alice@example.com", "Secret123").await.unwrap();

        h.sessions.logout_all(&first.user.id).await.unwrap();

        for token in [
            &first.tokens.refresh_token,
            &second.tokens.refresh_token,
            &third.tokens.refresh_token,
        ] {
            assert!(matches!(
                h.sessions.refresh(token).await.unwrap_err(),
                AuthError::InvalidRefreshToken
            ));
        }
    }

    #[tokio::test]
    async fn every_pair_persists_exactly_one_record() {
        let h = harness();
        let session = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        h.sessions.login("alice@example.com", "Secret123").await.unwrap();
        h.sessions.refresh(&session.tokens.refresh_token).await.unwrap();

        assert_eq!(h.store.refresh_token_count(&session.user.id).await, 3);
        let record = h
            .store
            .find_refresh_token_by_hash(&TokenCodec::hash_token(&session.tokens.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert!(record.revoked);
    }

    #[tokio::test]
    async fn change_password_requires_current_and_ends_sessions() {
        let h = harness();
        let session = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();

        let err = h
            .sessions
            .change_password(&session.user.id, "Wrong1234", "Newpass123")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        h.sessions
            .change_password(&session.user.id, "Secret123", "Newpass123")
            .await
            .unwrap();

        assert!(h.sessions.refresh(&session.tokens.refresh_token).await.is_err());
        assert!(h.sessions.login("alice@example.com", "Secret123").await.is_err());
        assert!(h.sessions.login("alice@example.com", "Newpass123").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_stored_role_issues_empty_permissions() {
        let h = harness();
        let session = h
            .sessions
            .register("alice@example.com", "Secret123", "Alice")
            .await
            .unwrap();
        let mut user = session.user.clone();
        user.role = "contractor".to_string();

        let pair = h.sessions.generate_token_pair(&user).await.unwrap();
        let claims = h.tokens.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.permissions, PermissionSet::new());
    }
}
