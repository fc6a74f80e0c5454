// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token codec: issues and verifies HS256-signed access and refresh tokens.
//!
//! The codec holds no mutable state. Verification is pure computation and
//! checks, in order: signature and structure, issuer, expiry, then the `kind`
//! claim. The kind is never trusted before the signature checks out.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::claims::{AccessClaims, RefreshClaims, TokenClaims, TokenKind};
use super::error::AuthError;
use super::permissions::PermissionSet;
use crate::config::{AuthSettings, ConfigError};
use crate::storage::UserRecord;

/// A freshly issued refresh token.
///
/// `token` goes to the client; only `token_hash` is persisted.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
}

impl TokenCodec {
    pub fn new(settings: &AuthSettings) -> Result<Self, ConfigError> {
        if settings.jwt_secret.is_empty() {
            return Err(ConfigError::Missing(crate::config::JWT_SECRET_ENV));
        }

        let ttl = |name: &'static str, value| {
            TimeDelta::from_std(value).map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&settings.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_aud = false;
        // issuer and verifier share one clock
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
            validation,
            issuer: settings.issuer.clone(),
            access_ttl: ttl(crate::config::ACCESS_TOKEN_TTL_ENV, settings.access_token_ttl)?,
            refresh_ttl: ttl(crate::config::REFRESH_TOKEN_TTL_ENV, settings.refresh_token_ttl)?,
        })
    }

    pub fn access_ttl(&self) -> TimeDelta {
        self.access_ttl
    }

    /// Issue an access token. The last-activity marker is the issuance time.
    pub fn issue_access_token(
        &self,
        user: &UserRecord,
        permissions: &PermissionSet,
    ) -> Result<String, AuthError> {
        self.issue_access_token_at(user, permissions, Utc::now())
    }

    pub(crate) fn issue_access_token_at(
        &self,
        user: &UserRecord,
        permissions: &PermissionSet,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = TokenClaims::Access(AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            permissions: permissions.clone(),
            iss: self.issuer.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.access_ttl).timestamp(),
            last_activity: issued_at.timestamp_millis(),
        });
        self.sign(&claims)
    }

    /// Issue a refresh token with a random `jti`.
    pub fn issue_refresh_token(&self, user: &UserRecord) -> Result<IssuedRefreshToken, AuthError> {
        self.issue_refresh_token_at(user, Utc::now())
    }

    pub(crate) fn issue_refresh_token_at(
        &self,
        user: &UserRecord,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedRefreshToken, AuthError> {
        let expires_at = issued_at + self.refresh_ttl;
        let claims = TokenClaims::Refresh(RefreshClaims {
            sub: user.id.clone(),
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        });
        let token = self.sign(&claims)?;

        Ok(IssuedRefreshToken {
            token_hash: Self::hash_token(&token),
            token,
            expires_at,
        })
    }

    /// Verify signature, issuer and expiry, then check the token kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, AuthError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!(error = %e, "token rejected");
                    AuthError::InvalidToken
                }
            },
        )?;

        if data.claims.kind() != expected {
            return Err(AuthError::WrongTokenKind);
        }
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        match self.verify(token, TokenKind::Access)? {
            TokenClaims::Access(claims) => Ok(claims),
            TokenClaims::Refresh(_) => Err(AuthError::WrongTokenKind),
        }
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        match self.verify(token, TokenKind::Refresh)? {
            TokenClaims::Refresh(claims) => Ok(claims),
            TokenClaims::Access(_) => Err(AuthError::WrongTokenKind),
        }
    }

    /// SHA-256 hex digest used to store and look up refresh tokens.
    pub fn hash_token(token: &str) -> String {
        format!("{:x}", Sha256::digest(token.as_bytes()))
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "failed to sign token");
            AuthError::Internal(format!("token signing failed: {e}"))
        })
    }
}
