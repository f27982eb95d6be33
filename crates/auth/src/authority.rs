//! Central role authority: rank comparison and permission lookup.
//!
//! Every "can this role do X" decision goes through [`RoleAuthority`]. Queries
//! are total: an absent role (profile not loaded yet) or a role missing from
//! the policy table resolves to no privilege, never to an error or a panic.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use thiserror::Error;

use crate::permissions::perms;
use crate::policy::{Rank, RoleEntry, RoleTable};
use crate::{Permission, PermissionSet, Role, RoleVocabulary};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("invalid role table: {0}")]
    InvalidTable(String),
}

#[derive(Debug, Clone)]
struct ResolvedRole {
    role: Role,
    rank: Rank,
    vocabulary: RoleVocabulary,
    description: Option<String>,
    permissions: PermissionSet,
}

/// Role → rank and role → permissions lookups over a fixed policy table.
///
/// Pure and immutable once built; share it through `Arc`.
#[derive(Debug, Clone)]
pub struct RoleAuthority {
    /// Most junior role first.
    roles: Vec<ResolvedRole>,
    index: HashMap<Role, usize>,
    empty: PermissionSet,
}

impl RoleAuthority {
    /// Authority over the table the CRM ships with.
    pub fn standard() -> Self {
        Self::build(RoleTable::standard().into_entries())
    }

    /// Process-wide standard authority, built on first use.
    pub fn shared() -> Arc<Self> {
        static STANDARD: OnceLock<Arc<RoleAuthority>> = OnceLock::new();
        STANDARD.get_or_init(|| Arc::new(Self::standard())).clone()
    }

    /// Build an authority from custom policy data.
    ///
    /// The table must list each role once, with ranks strictly increasing in
    /// declaration order.
    pub fn from_table(table: RoleTable) -> Result<Self, AuthorityError> {
        let entries = table.into_entries();
        if entries.is_empty() {
            return Err(AuthorityError::InvalidTable("table has no roles".into()));
        }

        {
            let mut seen: HashSet<&Role> = HashSet::new();
            for entry in &entries {
                if !seen.insert(&entry.role) {
                    return Err(AuthorityError::InvalidTable(format!(
                        "role '{}' declared twice",
                        entry.role
                    )));
                }
            }
        }

        for pair in entries.windows(2) {
            if pair[1].rank <= pair[0].rank {
                return Err(AuthorityError::InvalidTable(format!(
                    "rank of '{}' ({}) must be greater than rank of '{}' ({})",
                    pair[1].role, pair[1].rank, pair[0].role, pair[0].rank
                )));
            }
        }

        Ok(Self::build(entries))
    }

    fn build(entries: Vec<RoleEntry>) -> Self {
        let roles: Vec<ResolvedRole> = entries
            .into_iter()
            .map(|e| ResolvedRole {
                role: e.role,
                rank: e.rank,
                vocabulary: e.vocabulary,
                description: e.description,
                permissions: e.permissions.into_iter().collect(),
            })
            .collect();

        let index = roles
            .iter()
            .enumerate()
            .map(|(i, r)| (r.role.clone(), i))
            .collect();

        Self {
            roles,
            index,
            empty: PermissionSet::new(),
        }
    }

    fn lookup(&self, role: &Role) -> Option<&ResolvedRole> {
        self.index.get(role).map(|&i| &self.roles[i])
    }

    /// Lookup that logs unknown roles; `None` role means "not authenticated yet".
    fn resolve(&self, role: Option<&Role>) -> Option<&ResolvedRole> {
        let role = role?;
        let resolved = self.lookup(role);
        if resolved.is_none() {
            tracing::warn!(role = %role, "unknown role; treating as no privilege");
        }
        resolved
    }

    /// Roles in ascending seniority.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.iter().map(|r| &r.role)
    }

    pub fn knows(&self, role: &Role) -> bool {
        self.index.contains_key(role)
    }

    pub fn vocabulary(&self, role: &Role) -> Option<RoleVocabulary> {
        self.lookup(role).map(|r| r.vocabulary)
    }

    pub fn rank(&self, role: &Role) -> Result<Rank, AuthorityError> {
        self.lookup(role)
            .map(|r| r.rank)
            .ok_or_else(|| AuthorityError::UnknownRole(role.to_string()))
    }

    /// `rank(role) >= rank(target)`. False when either side is absent or unknown.
    pub fn is_at_least(&self, role: Option<&Role>, target: &Role) -> bool {
        match (self.resolve(role), self.resolve(Some(target))) {
            (Some(have), Some(want)) => have.rank >= want.rank,
            _ => false,
        }
    }

    /// Strict equality, for gates that apply to exactly one role.
    pub fn is_exactly(&self, role: Option<&Role>, target: &Role) -> bool {
        role == Some(target)
    }

    /// Declared permissions of `role`; empty for an absent or unknown role.
    pub fn permissions_for(&self, role: Option<&Role>) -> &PermissionSet {
        self.resolve(role)
            .map(|r| &r.permissions)
            .unwrap_or(&self.empty)
    }

    pub fn has_permission(&self, role: Option<&Role>, permission: &Permission) -> bool {
        self.permissions_for(role).contains(permission)
    }

    pub fn has_any(&self, role: Option<&Role>, permissions: &[Permission]) -> bool {
        let granted = self.permissions_for(role);
        permissions.iter().any(|p| granted.contains(p))
    }

    /// True when every listed permission is granted. An empty list only passes
    /// for a known role.
    pub fn has_all(&self, role: Option<&Role>, permissions: &[Permission]) -> bool {
        match self.resolve(role) {
            Some(r) => permissions.iter().all(|p| r.permissions.contains(p)),
            None => false,
        }
    }

    /// Known roles whose declared set contains `permission`, most junior first.
    pub fn roles_granting(&self, permission: &Permission) -> Vec<&Role> {
        self.roles
            .iter()
            .filter(|r| r.permissions.contains(permission))
            .map(|r| &r.role)
            .collect()
    }

    /// Display view of the whole table for configuration and member screens.
    pub fn catalog(&self) -> RoleCatalog {
        RoleCatalog {
            roles: self
                .roles
                .iter()
                .map(|r| RoleDefinition {
                    name: r.role.as_str().to_string(),
                    rank: r.rank,
                    vocabulary: r.vocabulary,
                    description: r.description.clone(),
                    permissions: r.permissions.iter().map(|p| p.as_str().to_string()).collect(),
                })
                .collect(),
        }
    }
}

impl Default for RoleAuthority {
    fn default() -> Self {
        Self::standard()
    }
}

/// Role definition with its granted permissions (for audit/display).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDefinition {
    pub name: String,
    pub rank: Rank,
    pub vocabulary: RoleVocabulary,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

/// Every role of an authority, most junior first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleCatalog {
    pub roles: Vec<RoleDefinition>,
}

/// Declares named capability checks, each a fixed permission lookup.
macro_rules! capabilities {
    ($($(#[$doc:meta])* $name:ident => $perm:expr;)*) => {
        impl RoleAuthority {
            $(
                $(#[$doc])*
                pub fn $name(&self, role: Option<&Role>) -> bool {
                    self.has_permission(role, &$perm)
                }
            )*

            /// Every named capability with the permission it checks.
            pub fn capabilities() -> Vec<(&'static str, Permission)> {
                vec![$((stringify!($name), $perm)),*]
            }
        }
    };
}

capabilities! {
    can_view_dashboard => perms::DASHBOARD_VIEW;
    /// See leads owned by other members.
    can_view_all_leads => perms::LEADS_VIEW_ALL;
    can_create_leads => perms::LEADS_CREATE;
    can_edit_leads => perms::LEADS_EDIT;
    can_delete_leads => perms::LEADS_DELETE;
    can_assign_leads => perms::LEADS_ASSIGN;
    /// Bulk lead import from spreadsheet files.
    can_upload_leads => perms::LEADS_UPLOAD;
    can_export_leads => perms::LEADS_EXPORT;
    can_view_members => perms::MEMBERS_VIEW;
    can_invite_members => perms::MEMBERS_INVITE;
    can_manage_users => perms::MEMBERS_MANAGE;
    can_change_roles => perms::MEMBERS_CHANGE_ROLE;
    can_view_reports => perms::REPORTS_VIEW;
    can_export_reports => perms::REPORTS_EXPORT;
    can_view_settings => perms::SETTINGS_VIEW;
    can_manage_settings => perms::SETTINGS_MANAGE;
    /// Use the tenant picker to act on another customer's data.
    can_switch_tenant => perms::TENANTS_SWITCH;
    can_manage_tenants => perms::TENANTS_MANAGE;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn authority() -> RoleAuthority {
        RoleAuthority::standard()
    }

    fn standard_roles() -> Vec<Role> {
        vec![
            Role::VIEWER,
            Role::MEMBER,
            Role::SALESPERSON,
            Role::MANAGER,
            Role::ADMIN,
            Role::SUPER_ADMIN,
        ]
    }

    #[test]
    fn standard_table_passes_validation() {
        assert!(RoleAuthority::from_table(RoleTable::standard()).is_ok());
    }

    #[test]
    fn ranks_strictly_increase_along_seniority() {
        let a = authority();
        let ranks: Vec<Rank> = standard_roles().iter().map(|r| a.rank(r).unwrap()).collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(a.roles().cloned().collect::<Vec<_>>(), standard_roles());
    }

    #[test]
    fn rank_of_unknown_role_is_an_error() {
        let err = authority().rank(&Role::new("owner")).unwrap_err();
        assert_eq!(err, AuthorityError::UnknownRole("owner".into()));
    }

    #[test]
    fn manager_scenario() {
        let a = authority();
        let manager = Some(&Role::MANAGER);

        assert!(a.is_at_least(manager, &Role::SALESPERSON));
        assert!(!a.is_at_least(manager, &Role::ADMIN));
        assert!(!a.has_permission(manager, &perms::LEADS_DELETE));
        assert!(a.has_permission(manager, &perms::LEADS_ASSIGN));
        assert!(a.can_assign_leads(manager));
        assert!(!a.can_delete_leads(manager));
    }

    #[test]
    fn admin_outranks_manager_without_inheriting_its_set() {
        let a = authority();
        let admin = Some(&Role::ADMIN);

        assert!(a.is_at_least(admin, &Role::MANAGER));
        assert!(a.has_permission(admin, &perms::LEADS_DELETE));
        assert!(!a.has_permission(admin, &perms::LEADS_ASSIGN));
    }

    #[test]
    fn super_admin_scenario() {
        let a = authority();
        assert!(a.is_exactly(Some(&Role::SUPER_ADMIN), &Role::SUPER_ADMIN));
        assert!(!a.is_exactly(Some(&Role::ADMIN), &Role::SUPER_ADMIN));
        assert!(!a.is_exactly(None, &Role::SUPER_ADMIN));
        assert!(a.has_all(Some(&Role::SUPER_ADMIN), &perms::all()));
    }

    #[test]
    fn absent_role_has_no_privilege() {
        let a = authority();
        assert!(a.permissions_for(None).is_empty());
        assert!(!a.is_at_least(None, &Role::VIEWER));
        assert!(!a.has_any(None, &[perms::DASHBOARD_VIEW]));
        assert!(!a.has_all(None, &[]));
        assert!(!a.can_view_dashboard(None));
    }

    #[test]
    fn unknown_role_fails_closed() {
        let a = authority();
        let owner = Role::new("owner");

        assert!(a.permissions_for(Some(&owner)).is_empty());
        assert!(!a.is_at_least(Some(&owner), &Role::VIEWER));
        assert!(!a.is_at_least(Some(&Role::SUPER_ADMIN), &owner));
        assert!(!a.has_all(Some(&owner), &[]));
    }

    #[test]
    fn has_any_and_has_all_follow_the_declared_set() {
        let a = authority();
        let sales = Some(&Role::SALESPERSON);

        assert!(a.has_any(sales, &[perms::LEADS_DELETE, perms::LEADS_UPLOAD]));
        assert!(!a.has_all(sales, &[perms::LEADS_DELETE, perms::LEADS_UPLOAD]));
        assert!(a.has_all(sales, &[perms::LEADS_CREATE, perms::LEADS_UPLOAD]));
        assert!(a.has_all(sales, &[]));
        assert!(!a.has_any(sales, &[]));
    }

    #[test]
    fn roles_granting_lists_non_monotonic_holders() {
        let a = authority();
        let holders = a.roles_granting(&perms::LEADS_ASSIGN);
        assert_eq!(holders, vec![&Role::MANAGER, &Role::SUPER_ADMIN]);
    }

    #[test]
    fn from_table_rejects_non_increasing_ranks() {
        let mut entries = RoleTable::standard().into_entries();
        entries[2].rank = entries[1].rank;
        let err = RoleAuthority::from_table(RoleTable::new(entries)).unwrap_err();
        assert!(matches!(err, AuthorityError::InvalidTable(_)));
    }

    #[test]
    fn from_table_rejects_duplicate_roles() {
        let mut entries = RoleTable::standard().into_entries();
        entries[1].role = Role::VIEWER;
        let err = RoleAuthority::from_table(RoleTable::new(entries)).unwrap_err();
        assert!(matches!(err, AuthorityError::InvalidTable(msg) if msg.contains("viewer")));
    }

    #[test]
    fn from_table_rejects_empty_table() {
        assert!(RoleAuthority::from_table(RoleTable::new(vec![])).is_err());
    }

    #[test]
    fn catalog_reports_vocabularies() {
        let catalog = authority().catalog();
        let extended: Vec<&str> = catalog
            .roles
            .iter()
            .filter(|r| r.vocabulary == RoleVocabulary::Extended)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(extended, ["salesperson", "manager"]);
    }

    #[test]
    fn every_capability_names_a_catalogued_permission() {
        let catalogue = perms::all();
        for (name, perm) in RoleAuthority::capabilities() {
            assert!(name.starts_with("can_"));
            assert!(catalogue.contains(&perm), "{name} checks unknown {perm}");
        }
    }

    #[test]
    fn shared_authority_is_reused() {
        assert!(Arc::ptr_eq(&RoleAuthority::shared(), &RoleAuthority::shared()));
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(standard_roles())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: is_at_least agrees with rank comparison for all pairs.
        #[test]
        fn is_at_least_matches_rank_order(r1 in any_role(), r2 in any_role()) {
            let a = authority();
            let expected = a.rank(&r1).unwrap() >= a.rank(&r2).unwrap();
            prop_assert_eq!(a.is_at_least(Some(&r1), &r2), expected);
        }

        /// Property: every role is at least itself.
        #[test]
        fn is_at_least_is_reflexive(r in any_role()) {
            prop_assert!(authority().is_at_least(Some(&r), &r));
        }

        /// Property: no permission is ever granted to an absent role.
        #[test]
        fn absent_role_never_has_permission(idx in 0usize..19) {
            let perm = perms::all()[idx].clone();
            prop_assert!(!authority().has_permission(None, &perm));
        }

        /// Property: arbitrary role strings outside the table get nothing.
        #[test]
        fn arbitrary_unknown_roles_get_nothing(name in "[a-z]{1,12}") {
            let a = authority();
            let role = Role::new(name);
            prop_assume!(!a.knows(&role));
            prop_assert!(a.permissions_for(Some(&role)).is_empty());
            prop_assert!(!a.is_at_least(Some(&role), &Role::VIEWER));
        }
    }
}
