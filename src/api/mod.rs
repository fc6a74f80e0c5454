// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        middleware::{enforce_guards, require_auth},
        Guard, Permission, Role,
    },
    models::{
        AuthResponse, ChangePasswordRequest, LoginRequest, LogoutRequest, MeResponse, MeUser,
        MessageResponse, PermissionsResponse, RefreshRequest, RegisterRequest,
        UpdateUserStatusRequest, UserProfile, UserResponse,
    },
    state::AppState,
};

pub mod auth;
pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/logout-all", post(auth::logout_all))
        .route("/me", get(auth::me))
        .route("/password", put(auth::change_password))
        .route("/permissions", get(auth::permissions));

    let manage_users = Arc::new(vec![Guard::Permission(Permission::UsersManage)]);
    let user_routes = Router::new()
        .route("/{user_id}", get(users::get_user))
        .merge(
            Router::new()
                .route("/{user_id}/status", patch(users::update_user_status))
                .route_layer(from_fn_with_state(manage_users, enforce_guards))
                .route_layer(from_fn_with_state(state.clone(), require_auth)),
        );

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::logout_all,
        auth::me,
        auth::change_password,
        auth::permissions,
        users::get_user,
        users::update_user_status
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            LogoutRequest,
            ChangePasswordRequest,
            UpdateUserStatusRequest,
            AuthResponse,
            MeResponse,
            MeUser,
            PermissionsResponse,
            MessageResponse,
            UserProfile,
            UserResponse,
            Role,
            Permission
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Registration, login and token lifecycle"),
        (name = "Users", description = "User profiles and account status")
    )
)]
struct ApiDoc;
