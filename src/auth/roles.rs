// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles and the privilege hierarchy.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::permissions::{Permission, PermissionSet};

/// User roles for authorization.
///
/// ## Role Hierarchy (lowest to highest)
///
/// - `Client` - Portal customer, sees only shared files and chat
/// - `Employee` - Day-to-day staff working leads, tasks and time
/// - `Manager` - Team lead, can assign, approve and review reports
/// - `Admin` - Full access to every permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Employee,
    Manager,
    Admin,
}

impl Role {
    /// Hierarchy from lowest to highest privilege.
    pub const HIERARCHY: [Role; 4] = [Role::Client, Role::Employee, Role::Manager, Role::Admin];

    /// Role given to accounts created through registration or federated login.
    pub const DEFAULT: Role = Role::Employee;

    /// Position in [`Role::HIERARCHY`].
    pub fn rank(self) -> usize {
        match self {
            Role::Client => 0,
            Role::Employee => 1,
            Role::Manager => 2,
            Role::Admin => 3,
        }
    }

    /// Check if this role sits at or above `required` in the hierarchy.
    pub fn is_at_least(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Permissions granted to this role.
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Role::Client => CLIENT_PERMISSIONS,
            Role::Employee => EMPLOYEE_PERMISSIONS,
            Role::Manager => MANAGER_PERMISSIONS,
            Role::Admin => Permission::ALL,
        }
    }

    /// Permissions granted to this role, as a set.
    pub fn permission_set(self) -> PermissionSet {
        self.permissions().iter().copied().collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Employee => "employee",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Parse role from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "client" => Some(Role::Client),
            "employee" => Some(Role::Employee),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const CLIENT_PERMISSIONS: &[Permission] = &[
    Permission::PortalAccess,
    Permission::FilesRead,
    Permission::ChatRead,
    Permission::ChatSend,
];

const EMPLOYEE_PERMISSIONS: &[Permission] = &[
    Permission::LeadsRead,
    Permission::LeadsCreate,
    Permission::LeadsUpdate,
    Permission::TasksRead,
    Permission::TasksCreate,
    Permission::ChatRead,
    Permission::ChatSend,
    Permission::TimeTrack,
    Permission::FilesRead,
];

const MANAGER_PERMISSIONS: &[Permission] = &[
    // employee grants
    Permission::LeadsRead,
    Permission::LeadsCreate,
    Permission::LeadsUpdate,
    Permission::TasksRead,
    Permission::TasksCreate,
    Permission::ChatRead,
    Permission::ChatSend,
    Permission::TimeTrack,
    Permission::FilesRead,
    // manager grants
    Permission::LeadsDelete,
    Permission::LeadsAssign,
    Permission::TasksUpdate,
    Permission::TasksDelete,
    Permission::ChatManage,
    Permission::TimeReadAll,
    Permission::TimeApprove,
    Permission::FilesUpload,
    Permission::FilesDelete,
    Permission::UsersRead,
    Permission::ReportsView,
];

/// Rank of a role name. Unknown names have no rank.
///
/// `Option` orders `None` below every `Some`, so unknown roles compare as
/// less privileged than any known role. This ordering is for sorting only:
/// `rank("admin") >= rank("ghost")` holds while [`is_at_least`]`("admin",
/// "ghost")` is false, because an unknown requirement grants nothing. Use
/// [`is_at_least`] for authorization.
pub fn rank(role: &str) -> Option<usize> {
    Role::parse(role).map(Role::rank)
}

/// Compare two role names by hierarchy.
///
/// An unknown `role` never satisfies a requirement, and an unknown `required`
/// is never satisfied.
pub fn is_at_least(role: &str, required: &str) -> bool {
    match (Role::parse(role), Role::parse(required)) {
        (Some(role), Some(required)) => role.is_at_least(required),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_is_strictly_ordered() {
        for pair in Role::HIERARCHY.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
            assert!(pair[1].is_at_least(pair[0]));
            assert!(!pair[0].is_at_least(pair[1]));
        }
    }

    #[test]
    fn admin_holds_every_permission() {
        assert_eq!(Role::Admin.permission_set().len(), Permission::ALL.len());
        for role in Role::HIERARCHY {
            assert!(role.permission_set().is_subset(&Role::Admin.permission_set()));
        }
    }

    #[test]
    fn employee_has_nine_default_permissions() {
        assert_eq!(Role::Employee.permission_set().len(), 9);
        assert_eq!(Role::DEFAULT, Role::Employee);
    }

    #[test]
    fn manager_extends_employee() {
        assert!(Role::Employee
            .permission_set()
            .is_subset(&Role::Manager.permission_set()));
        assert!(Role::Manager.permission_set().contains(&Permission::UsersRead));
        assert!(!Role::Manager.permission_set().contains(&Permission::UsersManage));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("MANAGER"), Some(Role::Manager));
        assert_eq!(Role::parse(" Employee "), Some(Role::Employee));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn unknown_roles_rank_below_known_roles() {
        assert!(rank("ghost") < rank("client"));
        assert!(!is_at_least("ghost", "client"));
        assert!(!is_at_least("ghost", "ghost"));
        assert!(!is_at_least("admin", "ghost"));
        // ranking still places the known role above
        assert!(rank("admin") >= rank("ghost"));
        assert!(is_at_least("admin", "client"));
        assert!(is_at_least("manager", "manager"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), r#""manager""#);
    }
}
