// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request gate and Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::Utc;

use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;

/// Run the gate against request headers.
///
/// 1. Bearer token from `Authorization`
/// 2. Access token verification
/// 3. Inactivity check on the embedded last-activity marker
/// 4. Fresh user lookup
/// 5. Principal built from the stored user, not the token's role claim
pub async fn authenticate(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers)?;
    let claims = state.tokens.verify_access(token)?;

    let idle_ms = Utc::now().timestamp_millis() - claims.last_activity;
    let limit_ms = i64::try_from(state.settings.inactivity_timeout.as_millis()).unwrap_or(i64::MAX);
    if idle_ms > limit_ms {
        tracing::debug!(user_id = %claims.sub, idle_ms, "session inactive");
        return Err(AuthError::InactivityTimeout);
    }

    let user = state
        .store
        .find_user_by_id(&claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    if !user.is_active {
        tracing::warn!(user_id = %user.id, "token presented for deactivated account");
        return Err(AuthError::AccountDeactivated);
    }

    Ok(AuthenticatedUser::new(&user, claims))
}

/// Extract the raw token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::TokenRequired)
}

/// Extractor for authenticated users.
///
/// Uses the principal attached by [`super::middleware::require_auth`] when
/// present, otherwise runs the gate itself.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(Auth(user): Auth) -> Json<MeResponse> {
///     // user.user_id contains the authenticated user's ID
///     // user.permissions is resolved from the stored role
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let user = authenticate(&parts.headers, state).await?;
        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid authentication is present, instead of rejecting.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(OptionalAuth(Some(user))),
            Err(e) => {
                tracing::debug!(code = e.error_code(), "optional auth skipped");
                Ok(OptionalAuth(None))
            }
        }
    }
}
