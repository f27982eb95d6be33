//! Role-change rules for member management.
//!
//! Invariants:
//! - Only roles holding `members:change_role` may change roles.
//! - A `super_admin` row can only be changed by a `super_admin`.
//! - Nobody can grant a role ranked above their own.
//! - Unknown roles on any side are rejected.

use crate::permissions::perms;
use crate::{AuthzError, Role, RoleAuthority};

/// Check whether `actor` may change a member from `current` to `requested`.
pub fn check_role_change(
    authority: &RoleAuthority,
    actor: Option<&Role>,
    current: &Role,
    requested: &Role,
) -> Result<(), AuthzError> {
    let actor = actor.ok_or(AuthzError::NotAuthenticated)?;

    for role in [actor, current, requested] {
        if !authority.knows(role) {
            tracing::warn!(role = %role, "role change rejected: unknown role");
            return Err(AuthzError::UnknownRole(role.to_string()));
        }
    }

    if !authority.has_permission(Some(actor), &perms::MEMBERS_CHANGE_ROLE) {
        return Err(AuthzError::Forbidden(
            perms::MEMBERS_CHANGE_ROLE.as_str().to_string(),
        ));
    }

    if authority.is_exactly(Some(current), &Role::SUPER_ADMIN)
        && !authority.is_exactly(Some(actor), &Role::SUPER_ADMIN)
    {
        return Err(AuthzError::ProtectedRole(current.to_string()));
    }

    if !authority.is_at_least(Some(actor), requested) {
        return Err(AuthzError::PrivilegeEscalation(requested.to_string()));
    }

    Ok(())
}

/// Roles `actor` may hand out, most junior first (drives the role dropdown).
pub fn assignable_roles(authority: &RoleAuthority, actor: Option<&Role>) -> Vec<Role> {
    if !authority.can_change_roles(actor) {
        return Vec::new();
    }

    authority
        .roles()
        .filter(|r| authority.is_at_least(actor, r))
        .cloned()
        .collect()
}
