// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing (bcrypt) and credential validation rules.
//!
//! Hashing and verification run on tokio's blocking pool so a slow bcrypt
//! round never stalls the async workers.

use super::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 72;
pub const MAX_FULL_NAME_LEN: usize = 100;

/// Hash a password with a fresh salt.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| {
            tracing::error!(error = %e, "failed to hash password");
            AuthError::Internal(format!("password hashing failed: {e}"))
        })
}

/// Compare a password against a stored bcrypt hash.
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash could not be parsed");
            Ok(false)
        }
    }
}

/// Password must be 8-72 characters with at least one letter and one digit.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    // bcrypt only reads the first 72 bytes
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_LEN} bytes"
        )));
    }
    if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(AuthError::Validation(
            "Password must contain at least one letter and one number".to_string(),
        ));
    }
    Ok(())
}

/// Basic email shape check on an already normalized address.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AuthError::Validation("A valid email address is required".to_string()))
    }
}

/// Trim and bound a display name.
pub fn validate_full_name(full_name: &str) -> Result<String, AuthError> {
    let trimmed = full_name.trim();
    if trimmed.is_empty() {
        return Err(AuthError::Validation("Full name is required".to_string()));
    }
    if trimmed.chars().count() > MAX_FULL_NAME_LEN {
        return Err(AuthError::Validation(format!(
            "Full name must be at most {MAX_FULL_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify() {
        let hash = hash_password("Secret123", 4).await.unwrap();
        assert_ne!(hash, "Secret123");
        assert!(verify_password("Secret123", &hash).await.unwrap());
        assert!(!verify_password("Secret124", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let a = hash_password("Secret123", 4).await.unwrap();
        let b = hash_password("Secret123", 4).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn malformed_hash_is_a_mismatch() {
        assert!(!verify_password("Secret123", "not-a-bcrypt-hash").await.unwrap());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("Secret123").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("onlyletters").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password(&format!("a1{}", "x".repeat(80))).is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a.b@sub.example.org").is_ok());
        assert!(validate_email("alice.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@localhost").is_err());
        assert!(validate_email("alice@@example.com").is_err());
        assert!(validate_email("al ice@example.com").is_err());
    }

    #[test]
    fn full_name_is_trimmed() {
        assert_eq!(validate_full_name("  Alice Doe ").unwrap(), "Alice Doe");
        assert!(validate_full_name("   ").is_err());
        assert!(validate_full_name(&"n".repeat(101)).is_err());
    }
}
