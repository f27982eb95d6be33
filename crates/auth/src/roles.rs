use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles stay opaque strings at this layer so that values coming from the
/// profile source can be represented even when they are not in the policy
/// table. Such roles resolve to no privilege in [`crate::RoleAuthority`].
///
/// `Role` has no ordering of its own; seniority comes from
/// [`crate::RoleAuthority::rank`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const VIEWER: Role = Role::from_static("viewer");
    pub const MEMBER: Role = Role::from_static("member");
    pub const SALESPERSON: Role = Role::from_static("salesperson");
    pub const MANAGER: Role = Role::from_static("manager");
    pub const ADMIN: Role = Role::from_static("admin");
    pub const SUPER_ADMIN: Role = Role::from_static("super_admin");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Build a role from loosely formatted input (`" Admin "` -> `admin`).
    ///
    /// Returns `None` for blank input, which callers treat as "no role yet".
    pub fn normalized(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(Cow::Owned(trimmed.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which of the two historical role vocabularies a role comes from.
///
/// The original four-tier set (`viewer`, `member`, `admin`, `super_admin`) was
/// later extended with `salesperson` and `manager`. Both are unified into one
/// ordering; the tag is kept so screens that only know the legacy set can
/// filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleVocabulary {
    Legacy,
    Extended,
}
