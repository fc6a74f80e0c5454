// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::{Auth, AuthError, OwnedResource, Role},
    error::ApiError,
    models::{UpdateUserStatusRequest, UserProfile, UserResponse},
    state::AppState,
};

/// Roles that may read any user's profile.
const PROFILE_READERS: [Role; 2] = [Role::Manager, Role::Admin];

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct UserPath {
    /// Identifier of the user
    pub user_id: String,
}

/// A user account belongs to itself.
impl OwnedResource for UserPath {
    fn owner_user_id(&self) -> &str {
        &self.user_id
    }
}

/// Get a user's profile. Callers may read their own; managers and admins may read any.
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}",
    params(UserPath),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Not the owner and no bypass role"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(target): Path<UserPath>,
) -> Result<Json<UserResponse>, ApiError> {
    // ownership first, so strangers cannot probe which ids exist
    target.require_owner_or_role(&caller, &PROFILE_READERS)?;

    let user = state
        .store
        .find_user_by_id(&target.user_id)
        .await
        .map_err(AuthError::from)?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(UserResponse {
        success: true,
        user: UserProfile::from(&user),
    }))
}

/// Activate or deactivate an account. Deactivation ends every session of the user.
#[utoipa::path(
    patch,
    path = "/v1/users/{user_id}/status",
    params(UserPath),
    request_body = UpdateUserStatusRequest,
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Cannot change own status"),
        (status = 403, description = "Missing users:manage permission"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(target): Path<UserPath>,
    payload: Result<Json<UpdateUserStatusRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(request) = payload?;

    if target.user_id == caller.user_id && !request.is_active {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }

    let user = state
        .sessions
        .set_active(&target.user_id, request.is_active)
        .await?;
    tracing::info!(
        actor = %caller.user_id,
        user_id = %user.id,
        is_active = user.is_active,
        "user status updated"
    );

    Ok(Json(UserResponse {
        success: true,
        user: UserProfile::from(&user),
    }))
}
