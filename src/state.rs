// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{SessionManager, TokenCodec};
use crate::config::{AuthSettings, ConfigError};
use crate::storage::CredentialStore;

/// Shared services, built once at startup and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub tokens: Arc<TokenCodec>,
    pub sessions: Arc<SessionManager>,
    pub settings: Arc<AuthSettings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        settings: AuthSettings,
    ) -> Result<Self, ConfigError> {
        let tokens = Arc::new(TokenCodec::new(&settings)?);
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&store),
            Arc::clone(&tokens),
            settings.bcrypt_cost,
        ));

        Ok(Self {
            store,
            tokens,
            sessions,
            settings: Arc::new(settings),
        })
    }
}
