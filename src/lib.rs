// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Opsdesk - Authentication, Session and RBAC Service
//!
//! Local accounts with bcrypt passwords, federated sign-in, rotating
//! single-use refresh tokens and a per-request gate that enforces inactivity
//! expiry, fresh account state and role/permission guards.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token codec, permission catalog, session manager, request gate
//! - `config` - Environment configuration
//! - `storage` - Credential store contract and in-memory implementation

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
