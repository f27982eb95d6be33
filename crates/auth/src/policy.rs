//! Static role policy data.
//!
//! The rank of every role and the permissions it grants are authored here as
//! plain data. Permission sets are declared per role and are never derived
//! from rank: `manager` holds `leads:assign` but not `leads:delete`, while
//! `admin` holds `leads:delete` but not `leads:assign`.

use serde::{Deserialize, Serialize};

use crate::permissions::perms::*;
use crate::{Permission, Role, RoleVocabulary};

/// Position of a role in the seniority order (higher is more senior).
pub type Rank = u32;

/// One row of the policy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub role: Role,
    pub rank: Rank,
    pub vocabulary: RoleVocabulary,
    #[serde(default)]
    pub description: Option<String>,
    pub permissions: Vec<Permission>,
}

/// Ordered policy table, most junior role first.
///
/// Deployments that need a different table can ship it as JSON and load it
/// with [`RoleTable::from_json`]; [`crate::RoleAuthority::from_table`]
/// validates it before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleTable {
    entries: Vec<RoleEntry>,
}

impl RoleTable {
    pub fn new(entries: Vec<RoleEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn entries(&self) -> &[RoleEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<RoleEntry> {
        self.entries
    }

    /// The table the CRM ships with.
    pub fn standard() -> Self {
        let viewer = vec![DASHBOARD_VIEW, LEADS_VIEW_OWN, REPORTS_VIEW];

        let member = vec![
            DASHBOARD_VIEW,
            LEADS_VIEW_OWN,
            LEADS_CREATE,
            LEADS_EDIT,
            REPORTS_VIEW,
        ];

        let salesperson = vec![
            DASHBOARD_VIEW,
            LEADS_VIEW_OWN,
            LEADS_CREATE,
            LEADS_EDIT,
            LEADS_UPLOAD,
            REPORTS_VIEW,
        ];

        let manager = vec![
            DASHBOARD_VIEW,
            LEADS_VIEW_OWN,
            LEADS_VIEW_ALL,
            LEADS_CREATE,
            LEADS_EDIT,
            LEADS_ASSIGN,
            LEADS_UPLOAD,
            LEADS_EXPORT,
            MEMBERS_VIEW,
            REPORTS_VIEW,
            REPORTS_EXPORT,
        ];

        let admin = vec![
            DASHBOARD_VIEW,
            LEADS_VIEW_OWN,
            LEADS_VIEW_ALL,
            LEADS_CREATE,
            LEADS_EDIT,
            LEADS_DELETE,
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
        ];

        let super_admin = crate::permissions::perms::all();

        Self::new(vec![
            entry(Role::VIEWER, 0, RoleVocabulary::Legacy, "Read-only access to own leads and reports", viewer),
            entry(Role::MEMBER, 1, RoleVocabulary::Legacy, "Works own leads", member),
            entry(Role::SALESPERSON, 2, RoleVocabulary::Extended, "Works own leads and uploads lead files", salesperson),
            entry(Role::MANAGER, 3, RoleVocabulary::Extended, "Oversees the sales team and assigns leads", manager),
            entry(Role::ADMIN, 4, RoleVocabulary::Legacy, "Administers members and settings of a tenant", admin),
            entry(Role::SUPER_ADMIN, 5, RoleVocabulary::Legacy, "Platform operator with access to every tenant", super_admin),
        ])
    }
}

fn entry(
    role: Role,
    rank: Rank,
    vocabulary: RoleVocabulary,
    description: &str,
    permissions: Vec<Permission>,
) -> RoleEntry {
    RoleEntry {
        role,
        rank,
        vocabulary,
        description: Some(description.to_string()),
        permissions,
    }
}
