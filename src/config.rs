// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup. Any invalid
//! value (including a malformed duration string) aborts startup instead of
//! failing later at request time.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `APP_ENV` | `production` marks refresh cookies `Secure` | `development` |
//! | `JWT_SECRET` | HMAC signing secret (at least 32 bytes) | Required |
//! | `JWT_ISSUER` | Issuer claim written to and expected on tokens | `opsdesk-api` |
//! | `ACCESS_TOKEN_TTL` | Access token lifetime | `15m` |
//! | `REFRESH_TOKEN_TTL` | Refresh token lifetime | `7d` |
//! | `INACTIVITY_TIMEOUT` | Maximum idle time before a session is rejected | `24h` |
//! | `BCRYPT_COST` | bcrypt work factor | `12` |
//! | `SEED_ADMIN_EMAIL` | Bootstrap admin email | Optional |
//! | `SEED_ADMIN_PASSWORD` | Bootstrap admin password | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const APP_ENV_ENV: &str = "APP_ENV";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const ACCESS_TOKEN_TTL_ENV: &str = "ACCESS_TOKEN_TTL";
pub const REFRESH_TOKEN_TTL_ENV: &str = "REFRESH_TOKEN_TTL";
pub const INACTIVITY_TIMEOUT_ENV: &str = "INACTIVITY_TIMEOUT";
pub const BCRYPT_COST_ENV: &str = "BCRYPT_COST";
pub const SEED_ADMIN_EMAIL_ENV: &str = "SEED_ADMIN_EMAIL";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ISSUER: &str = "opsdesk-api";
const DEFAULT_ACCESS_TTL: &str = "15m";
const DEFAULT_REFRESH_TTL: &str = "7d";
const DEFAULT_INACTIVITY_TIMEOUT: &str = "24h";
const DEFAULT_BCRYPT_COST: u32 = 12;

/// Shortest secret accepted for HMAC-SHA256 signing.
pub const MIN_SECRET_LEN: usize = 32;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("invalid duration {value:?}: {reason}")]
    Duration { value: String, reason: &'static str },
}

/// Settings consumed by the token codec, session manager and request gate.
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub issuer: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub inactivity_timeout: Duration,
    pub bcrypt_cost: u32,
    /// Whether refresh cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("inactivity_timeout", &self.inactivity_timeout)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

/// Optional bootstrap administrator created at startup.
#[derive(Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Full process configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub auth: AuthSettings,
    pub seed_admin: Option<SeedAdmin>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got {other:?}"),
                })
            }
        };

        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: JWT_SECRET_ENV,
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }

        let duration = |name: &'static str, default: &str| {
            parse_duration(get(name).as_deref().unwrap_or(default))
        };

        let bcrypt_cost = match get(BCRYPT_COST_ENV) {
            Some(raw) => {
                let cost = raw.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
                    name: BCRYPT_COST_ENV,
                    reason: e.to_string(),
                })?;
                if !(4..=31).contains(&cost) {
                    return Err(ConfigError::Invalid {
                        name: BCRYPT_COST_ENV,
                        reason: "must be between 4 and 31".to_string(),
                    });
                }
                cost
            }
            None => DEFAULT_BCRYPT_COST,
        };

        let auth = AuthSettings {
            jwt_secret,
            issuer: get(JWT_ISSUER_ENV).unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
            access_token_ttl: duration(ACCESS_TOKEN_TTL_ENV, DEFAULT_ACCESS_TTL)?,
            refresh_token_ttl: duration(REFRESH_TOKEN_TTL_ENV, DEFAULT_REFRESH_TTL)?,
            inactivity_timeout: duration(INACTIVITY_TIMEOUT_ENV, DEFAULT_INACTIVITY_TIMEOUT)?,
            bcrypt_cost,
            secure_cookies: get(APP_ENV_ENV)
                .map(|v| v.trim().eq_ignore_ascii_case("production"))
                .unwrap_or(false),
        };

        let seed_admin = match (get(SEED_ADMIN_EMAIL_ENV), get(SEED_ADMIN_PASSWORD_ENV)) {
            (Some(email), Some(password)) => Some(SeedAdmin { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(SEED_ADMIN_PASSWORD_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(SEED_ADMIN_EMAIL_ENV)),
        };

        Ok(Self {
            host,
            port,
            log_format,
            auth,
            seed_admin,
        })
    }
}

/// Parse a human-readable duration such as `15m`, `7d` or `500ms`.
///
/// Supported units: `ms`, `s`, `m`, `h`, `d`, `w`. A bare number is read as
/// milliseconds. Zero durations are rejected.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason| ConfigError::Duration {
        value: input.to_string(),
        reason,
    };

    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    if digits.is_empty() {
        return Err(invalid("missing numeric value"));
    }
    let value: u64 = digits.parse().map_err(|_| invalid("numeric value out of range"))?;

    let unit_millis: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 604_800_000,
        _ => return Err(invalid("unknown unit (expected ms, s, m, h, d or w)")),
    };

    let millis = value
        .checked_mul(unit_millis)
        .ok_or_else(|| invalid("duration overflows"))?;
    if millis == 0 {
        return Err(invalid("duration must be greater than zero"));
    }

    Ok(Duration::from_millis(millis))
}
