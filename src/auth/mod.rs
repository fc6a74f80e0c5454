// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Local accounts, token sessions and role-based access control.
//!
//! ## Auth Flow
//!
//! 1. Client registers or logs in (password or federated identity)
//! 2. Server returns a short-lived access token and a single-use refresh token
//! 3. Client sends `Authorization: Bearer <access token>` on every request
//! 4. The request gate:
//!    - Verifies signature, issuer, expiry and token kind
//!    - Rejects sessions idle longer than the inactivity timeout
//!    - Re-fetches the user, so deactivation and role changes apply at once
//!    - Resolves permissions from the stored role
//! 5. Client exchanges the refresh token for a new pair; the old one is revoked
//!
//! ## Security
//!
//! - Passwords are stored as bcrypt hashes
//! - Refresh tokens are stored as SHA-256 hashes only
//! - A refresh token can be exchanged at most once
//! - No clock skew tolerance: a token is rejected once `exp` has passed

pub mod claims;
pub mod error;
pub mod extractor;
pub mod guards;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod token;

pub use claims::{AccessClaims, AuthenticatedUser, RefreshClaims, TokenClaims, TokenKind};
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use guards::{authorize, Guard, OwnedResource};
pub use permissions::{permissions_for, Permission, PermissionSet};
pub use roles::Role;
pub use session::{normalize_email, AuthSession, FederatedProfile, SessionManager, TokenPair};
pub use token::TokenCodec;
