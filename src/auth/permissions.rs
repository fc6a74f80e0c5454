// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission catalog.
//!
//! Permissions are `resource:action` strings grouped by resource domain. The
//! set a user holds is derived purely from their role (see
//! [`Role::permissions`]); there are no per-user overrides.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Set of permissions, ordered for stable serialization.
pub type PermissionSet = BTreeSet<Permission>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    // leads
    #[serde(rename = "leads:read")]
    LeadsRead,
    #[serde(rename = "leads:create")]
    LeadsCreate,
    #[serde(rename = "leads:update")]
    LeadsUpdate,
    #[serde(rename = "leads:delete")]
    LeadsDelete,
    #[serde(rename = "leads:assign")]
    LeadsAssign,
    // tasks
    #[serde(rename = "tasks:read")]
    TasksRead,
    #[serde(rename = "tasks:create")]
    TasksCreate,
    #[serde(rename = "tasks:update")]
    TasksUpdate,
    #[serde(rename = "tasks:delete")]
    TasksDelete,
    // chat
    #[serde(rename = "chat:read")]
    ChatRead,
    #[serde(rename = "chat:send")]
    ChatSend,
    #[serde(rename = "chat:manage")]
    ChatManage,
    // time
    #[serde(rename = "time:track")]
    TimeTrack,
    #[serde(rename = "time:read_all")]
    TimeReadAll,
    #[serde(rename = "time:approve")]
    TimeApprove,
    // files
    #[serde(rename = "files:read")]
    FilesRead,
    #[serde(rename = "files:upload")]
    FilesUpload,
    #[serde(rename = "files:delete")]
    FilesDelete,
    // users
    #[serde(rename = "users:read")]
    UsersRead,
    #[serde(rename = "users:manage")]
    UsersManage,
    // reports / settings / portal
    #[serde(rename = "reports:view")]
    ReportsView,
    #[serde(rename = "settings:manage")]
    SettingsManage,
    #[serde(rename = "portal:access")]
    PortalAccess,
}

impl Permission {
    pub const ALL: &'static [Permission] = &[
        Permission::LeadsRead,
        Permission::LeadsCreate,
        Permission::LeadsUpdate,
        Permission::LeadsDelete,
        Permission::LeadsAssign,
        Permission::TasksRead,
        Permission::TasksCreate,
        Permission::TasksUpdate,
        Permission::TasksDelete,
        Permission::ChatRead,
        Permission::ChatSend,
        Permission::ChatManage,
        Permission::TimeTrack,
        Permission::TimeReadAll,
        Permission::TimeApprove,
        Permission::FilesRead,
        Permission::FilesUpload,
        Permission::FilesDelete,
        Permission::UsersRead,
        Permission::UsersManage,
        Permission::ReportsView,
        Permission::SettingsManage,
        Permission::PortalAccess,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::LeadsRead => "leads:read",
            Permission::LeadsCreate => "leads:create",
            Permission::LeadsUpdate => "leads:update",
            Permission::LeadsDelete => "leads:delete",
            Permission::LeadsAssign => "leads:assign",
            Permission::TasksRead => "tasks:read",
            Permission::TasksCreate => "tasks:create",
            Permission::TasksUpdate => "tasks:update",
            Permission::TasksDelete => "tasks:delete",
            Permission::ChatRead => "chat:read",
            Permission::ChatSend => "chat:send",
            Permission::ChatManage => "chat:manage",
            Permission::TimeTrack => "time:track",
            Permission::TimeReadAll => "time:read_all",
            Permission::TimeApprove => "time:approve",
            Permission::FilesRead => "files:read",
            Permission::FilesUpload => "files:upload",
            Permission::FilesDelete => "files:delete",
            Permission::UsersRead => "users:read",
            Permission::UsersManage => "users:manage",
            Permission::ReportsView => "reports:view",
            Permission::SettingsManage => "settings:manage",
            Permission::PortalAccess => "portal:access",
        }
    }

    pub fn parse(s: &str) -> Option<Permission> {
        Permission::ALL.iter().copied().find(|p| p.as_str() == s)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permissions granted to a role name. Unknown roles get an empty set.
pub fn permissions_for(role: &str) -> PermissionSet {
    Role::parse(role)
        .map(Role::permission_set)
        .unwrap_or_default()
}

pub fn has_permission(role: &str, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

/// True if the role holds at least one of `permissions`.
pub fn has_any(role: &str, permissions: &[Permission]) -> bool {
    let granted = permissions_for(role);
    permissions.iter().any(|p| granted.contains(p))
}

/// True if the role holds every one of `permissions`.
pub fn has_all(role: &str, permissions: &[Permission]) -> bool {
    let granted = permissions_for(role);
    permissions.iter().all(|p| granted.contains(p))
}
