use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque `area:action` strings (e.g.
/// `"leads:view_all"`). Each role's set is declared explicitly in the policy
/// table; nothing is implied by a permission's name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered set of permissions (deterministic iteration for display and audit).
pub type PermissionSet = BTreeSet<Permission>;

/// The permission catalogue used by the standard policy table.
pub mod perms {
    use super::Permission;

    pub const DASHBOARD_VIEW: Permission = Permission::from_static("dashboard:view");

    pub const LEADS_VIEW_OWN: Permission = Permission::from_static("leads:view_own");
    pub const LEADS_VIEW_ALL: Permission = Permission::from_static("leads:view_all");
    pub const LEADS_CREATE: Permission = Permission::from_static("leads:create");
    pub const LEADS_EDIT: Permission = Permission::from_static("leads:edit");
    pub const LEADS_DELETE: Permission = Permission::from_static("leads:delete");
    pub const LEADS_ASSIGN: Permission = Permission::from_static("leads:assign");
    pub const LEADS_UPLOAD: Permission = Permission::from_static("leads:upload");
    pub const LEADS_EXPORT: Permission = Permission::from_static("leads:export");

    pub const MEMBERS_VIEW: Permission = Permission::from_static("members:view");
    pub const MEMBERS_INVITE: Permission = Permission::from_static("members:invite");
    pub const MEMBERS_MANAGE: Permission = Permission::from_static("members:manage");
    pub const MEMBERS_CHANGE_ROLE: Permission = Permission::from_static("members:change_role");

    pub const REPORTS_VIEW: Permission = Permission::from_static("reports:view");
    pub const REPORTS_EXPORT: Permission = Permission::from_static("reports:export");

    pub const SETTINGS_VIEW: Permission = Permission::from_static("settings:view");
    pub const SETTINGS_MANAGE: Permission = Permission::from_static("settings:manage");

    pub const TENANTS_SWITCH: Permission = Permission::from_static("tenants:switch");
    pub const TENANTS_MANAGE: Permission = Permission::from_static("tenants:manage");

    /// Every permission in the catalogue.
    pub fn all() -> Vec<Permission> {
        vec![
            DASHBOARD_VIEW,
            LEADS_VIEW_OWN,
            LEADS_VIEW_ALL,
            LEADS_CREATE,
            LEADS_EDIT,
            LEADS_DELETE,
            LEADS_ASSIGN,
            LEADS_UPLOAD,
            LEADS_EXPORT,
            MEMBERS_VIEW,
            MEMBERS_INVITE,
            MEMBERS_MANAGE,
            MEMBERS_CHANGE_ROLE,
            REPORTS_VIEW,
            REPORTS_EXPORT,
            SETTINGS_VIEW,
            SETTINGS_MANAGE,
            TENANTS_SWITCH,
            TENANTS_MANAGE,
        ]
    }
}
