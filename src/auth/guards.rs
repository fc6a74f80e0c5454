// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization guards.
//!
//! A guard is a predicate over the authenticated principal that either allows
//! the request or denies it with a reason. Guards are plain data so a route
//! can carry a list of them and [`authorize`] runs that list in order; since
//! every guard only reads the principal, the order never changes the outcome
//! of a passing request.
//!
//! Ownership checks need the resource, so they are built per request through
//! [`OwnedResource`] instead of being declared on the route.

use super::permissions::Permission;
use super::roles::Role;
use super::{AuthError, AuthenticatedUser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Role must be one of the listed roles.
    Role(Vec<Role>),
    /// Role must be at or above the given role in the hierarchy.
    MinRole(Role),
    Permission(Permission),
    AnyPermission(Vec<Permission>),
    AllPermissions(Vec<Permission>),
    /// Caller owns the resource, or holds one of the bypass roles.
    OwnerOrRole { owner_id: String, roles: Vec<Role> },
}

impl Guard {
    pub fn role(roles: impl IntoIterator<Item = Role>) -> Self {
        Guard::Role(roles.into_iter().collect())
    }

    pub fn any_permission(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Guard::AnyPermission(permissions.into_iter().collect())
    }

    pub fn all_permissions(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Guard::AllPermissions(permissions.into_iter().collect())
    }

    pub fn owner_or_role(
        owner_id: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Guard::OwnerOrRole {
            owner_id: owner_id.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Evaluate this guard against the (possibly absent) principal.
    pub fn check(&self, principal: Option<&AuthenticatedUser>) -> Result<(), AuthError> {
        let user = principal.ok_or(AuthError::AuthRequired)?;

        match self {
            Guard::Role(roles) => {
                if user.known_role().is_some_and(|role| roles.contains(&role)) {
                    Ok(())
                } else {
                    Err(insufficient_role(roles, user))
                }
            }
            Guard::MinRole(required) => {
                if user.has_role(*required) {
                    Ok(())
                } else {
                    let at_or_above = Role::HIERARCHY
                        .iter()
                        .copied()
                        .filter(|role| role.is_at_least(*required))
                        .collect::<Vec<_>>();
                    Err(insufficient_role(&at_or_above, user))
                }
            }
            Guard::Permission(permission) => {
                if user.has_permission(*permission) {
                    Ok(())
                } else {
                    Err(insufficient_permission(std::slice::from_ref(permission), user))
                }
            }
            Guard::AnyPermission(permissions) => {
                if permissions.iter().any(|p| user.has_permission(*p)) {
                    Ok(())
                } else {
                    Err(insufficient_permission(permissions, user))
                }
            }
            Guard::AllPermissions(permissions) => {
                if permissions.iter().all(|p| user.has_permission(*p)) {
                    Ok(())
                } else {
                    Err(insufficient_permission(permissions, user))
                }
            }
            Guard::OwnerOrRole { owner_id, roles } => {
                let bypass = user.known_role().is_some_and(|role| roles.contains(&role));
                if *owner_id == user.user_id || bypass {
                    Ok(())
                } else {
                    tracing::debug!(
                        user_id = %user.user_id,
                        owner_id = %owner_id,
                        "ownership check failed"
                    );
                    Err(AuthError::AccessDenied {
                        required: roles.iter().map(|r| r.to_string()).collect(),
                        actual: user.role.clone(),
                    })
                }
            }
        }
    }
}

/// Run every guard in order, stopping at the first denial.
pub fn authorize(principal: Option<&AuthenticatedUser>, guards: &[Guard]) -> Result<(), AuthError> {
    guards.iter().try_for_each(|guard| guard.check(principal))
}

fn insufficient_role(required: &[Role], user: &AuthenticatedUser) -> AuthError {
    AuthError::InsufficientRole {
        required: required.iter().map(|r| r.to_string()).collect(),
        actual: user.role.clone(),
    }
}

fn insufficient_permission(required: &[Permission], user: &AuthenticatedUser) -> AuthError {
    AuthError::InsufficientPermission {
        required: required.iter().map(|p| p.to_string()).collect(),
        actual: user.permissions.iter().map(|p| p.to_string()).collect(),
    }
}

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;

    /// Allow the owner, or anyone holding one of the bypass roles.
    fn require_owner_or_role(
        &self,
        user: &AuthenticatedUser,
        roles: &[Role],
    ) -> Result<(), AuthError> {
        Guard::owner_or_role(self.owner_user_id(), roles.iter().copied()).check(Some(user))
    }
}
