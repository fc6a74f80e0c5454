// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication endpoints.
//!
//! The refresh token is returned in the body and also set as an HttpOnly
//! cookie scoped to `/v1/auth`, so browser clients never have to store it.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::COOKIE, header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::Utc;

use crate::{
    auth::{Auth, AuthSession, OptionalAuth, Role},
    error::ApiError,
    models::{
        AuthResponse, ChangePasswordRequest, LoginRequest, LogoutRequest, MeResponse,
        MessageResponse, PermissionsResponse, RefreshRequest, RegisterRequest, UserProfile,
    },
    state::AppState,
};

pub const REFRESH_COOKIE: &str = "refresh_token";
const REFRESH_COOKIE_PATH: &str = "/v1/auth";

fn refresh_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let secure_flag = if secure { " Secure;" } else { "" };
    format!(
        "{REFRESH_COOKIE}={token}; Path={REFRESH_COOKIE_PATH}; HttpOnly; SameSite=Strict;{secure_flag} Max-Age={max_age_secs}"
    )
}

fn clear_refresh_cookie(secure: bool) -> String {
    refresh_cookie("", 0, secure)
}

/// Read a cookie value from the `Cookie` header.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then_some(value.trim())
        })
        .filter(|value| !value.is_empty())
}

/// Body token wins over the cookie.
fn presented_refresh_token(body: Option<String>, headers: &HeaderMap) -> Option<String> {
    body.filter(|t| !t.is_empty())
        .or_else(|| cookie_value(headers, REFRESH_COOKIE).map(str::to_string))
}

fn session_response(
    state: &AppState,
    session: AuthSession,
    status: StatusCode,
) -> impl IntoResponse {
    let max_age = (session.tokens.refresh_expires_at - Utc::now()).num_seconds().max(0);
    let cookie = refresh_cookie(
        &session.tokens.refresh_token,
        max_age,
        state.settings.secure_cookies,
    );
    let body = AuthResponse {
        success: true,
        permissions: crate::auth::permissions_for(&session.user.role),
        user: UserProfile::from(&session.user),
        access_token: session.tokens.access_token,
        refresh_token: session.tokens.refresh_token,
        expires_in: state.tokens.access_ttl().num_seconds(),
    };
    (status, AppendHeaders([(SET_COOKIE, cookie)]), Json(body))
}

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Account created and signed in", body = AuthResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let session = state
        .sessions
        .register(&request.email, &request.password, &request.full_name)
        .await?;
    Ok(session_response(&state, session, StatusCode::CREATED))
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Account must use federated login"),
        (status = 401, description = "Invalid credentials or deactivated account"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let session = state.sessions.login(&request.email, &request.password).await?;
    Ok(session_response(&state, session, StatusCode::OK))
}

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "New token pair issued", body = AuthResponse),
        (status = 400, description = "No refresh token presented"),
        (status = 401, description = "Refresh token invalid, expired or already used"),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // no body at all is fine when the cookie carries the token
    let body_token = payload.ok().and_then(|Json(request)| request.refresh_token);
    let token = presented_refresh_token(body_token, &headers)
        .ok_or_else(|| ApiError::bad_request("Refresh token required"))?;

    let session = state.sessions.refresh(&token).await?;
    Ok(session_response(&state, session, StatusCode::OK))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    request_body = LogoutRequest,
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Refresh token revoked", body = MessageResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Auth(user): Auth,
    headers: HeaderMap,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body_token = payload.ok().and_then(|Json(request)| request.refresh_token);
    let token = presented_refresh_token(body_token, &headers);

    state.sessions.logout(&user.user_id, token.as_deref()).await?;

    let cookie = clear_refresh_cookie(state.settings.secure_cookies);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse::ok("Logged out")),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout-all",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Every refresh token of the caller revoked", body = MessageResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn logout_all(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.logout_all(&user.user_id).await?;

    let cookie = clear_refresh_cookie(state.settings.secure_cookies);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse::ok("Logged out from all devices")),
    ))
}

/// Get the current authenticated user with permissions resolved from the stored role.
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn me(Auth(user): Auth) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user: user.into(),
    })
}

#[utoipa::path(
    put,
    path = "/v1/auth/password",
    request_body = ChangePasswordRequest,
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Password changed, all sessions ended", body = MessageResponse),
        (status = 400, description = "Validation failed or federated-only account"),
        (status = 401, description = "Current password is wrong"),
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    Auth(user): Auth,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    state
        .sessions
        .change_password(&user.user_id, &request.current_password, &request.new_password)
        .await?;

    let cookie = clear_refresh_cookie(state.settings.secure_cookies);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse::ok("Password changed. Please log in again")),
    ))
}

/// Permissions of the caller, or an empty set for anonymous callers.
#[utoipa::path(
    get,
    path = "/v1/auth/permissions",
    tag = "Auth",
    responses((status = 200, description = "Caller's permissions", body = PermissionsResponse))
)]
pub async fn permissions(OptionalAuth(user): OptionalAuth) -> Json<PermissionsResponse> {
    let (role, permissions) = match user {
        Some(user) => (Some(user.role), user.permissions),
        None => (None, Default::default()),
    };
    Json(PermissionsResponse {
        success: true,
        role,
        permissions,
        hierarchy: Role::HIERARCHY.to_vec(),
    })
}
