// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use opsdesk_server::{
    api::router,
    auth::{AuthError, Role},
    config::{AppConfig, LogFormat, SeedAdmin},
    state::AppState,
    storage::InMemoryStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

fn init_logging(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .ok(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .ok(),
    };
}

/// Create the bootstrap administrator unless the account already exists.
async fn seed_admin(state: &AppState, seed: &SeedAdmin) -> Result<(), AuthError> {
    match state
        .sessions
        .create_password_account(&seed.email, &seed.password, "Administrator", Role::Admin)
        .await
    {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "seeded admin account");
            Ok(())
        }
        Err(AuthError::EmailAlreadyRegistered) => {
            tracing::info!("seed admin already present");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(config.log_format);

    let state = match AppState::new(Arc::new(InMemoryStore::new()), config.auth.clone()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize auth services");
            return ExitCode::FAILURE;
        }
    };

    if let Some(seed) = &config.seed_admin {
        if let Err(e) = seed_admin(&state, seed).await {
            tracing::error!(error = %e, "failed to seed admin account");
            return ExitCode::FAILURE;
        }
    }

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, host = %config.host, "failed to parse bind address");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(%addr, settings = ?config.auth, "Opsdesk auth server listening (docs at /docs)");

    let app = router(state);
    if let Err(e) = axum_server::bind(addr).serve(app.into_make_service()).await {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
