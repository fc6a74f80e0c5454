// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Router-level counterpart of the extractors: `require_auth` and
//! `optional_auth` run the request gate for a whole subtree and attach the
//! principal to the request extensions, where `Auth` picks it up.
//! `enforce_guards` then applies a route's guard list.
//!
//! ```rust,ignore
//! let manage = Arc::new(vec![Guard::Permission(Permission::UsersManage)]);
//!
//! let app = Router::new()
//!     .route("/users/{user_id}/status", patch(update_status))
//!     .route_layer(axum::middleware::from_fn_with_state(manage, enforce_guards))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::authenticate;
use super::guards::{authorize, Guard};
use super::AuthenticatedUser;
use crate::state::AppState;

/// Reject the request unless the gate accepts it.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &state).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Attach the principal when the gate accepts the request, continue anonymously otherwise.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &state).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
        }
        Err(e) => tracing::debug!(code = e.error_code(), "continuing unauthenticated"),
    }
    next.run(request).await
}

/// Apply a guard list to the principal attached by an outer auth layer.
pub async fn enforce_guards(
    State(guards): State<Arc<Vec<Guard>>>,
    request: Request,
    next: Next,
) -> Response {
    let principal = request.extensions().get::<AuthenticatedUser>();
    if let Err(e) = authorize(principal, &guards) {
        return e.into_response();
    }
    next.run(request).await
}
