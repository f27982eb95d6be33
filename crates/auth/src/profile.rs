//! User profile as delivered by the authentication provider / backend.

use serde::{Deserialize, Deserializer, Serialize};

use crm_core::{ProfileId, TenantId};

use crate::Role;

/// The signed-in user's profile.
///
/// `role` is `None` while the profile is still loading or when the source sent
/// no role; every authority query then fails closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, deserialize_with = "deserialize_role")]
    pub role: Option<Role>,
    /// Tenant the user belongs to.
    #[serde(default, alias = "cliente_id")]
    pub tenant_id: Option<TenantId>,
}

impl Profile {
    pub fn new(id: ProfileId, email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: display_name.into(),
            role: None,
            tenant_id: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }
}

fn deserialize_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Role::normalized))
}
