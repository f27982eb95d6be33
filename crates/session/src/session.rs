use std::sync::Arc;

use anyhow::Context;
use http::HeaderMap;

use crm_auth::{Permission, Profile, Role, RoleAuthority, authorize, perms};
use crm_core::TenantId;
use crm_tenancy::{
    FileTenantStore, Subscription, TenantChange, TenantScope, TenantScoped, TenantState,
    TenantStore, scoped_link, tenant_from_query, tenant_headers,
};

use crate::{SessionConfig, SessionError};

/// Everything a signed-in view needs to gate actions and scope requests.
///
/// Lifecycle: [`Session::start`] at sign-in (or page load), [`Session::end`] at
/// sign-out. Listeners registered through the session are removed on `end`.
///
/// Until a profile is loaded every check fails closed.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    authority: Arc<RoleAuthority>,
    scope: TenantScope,
    profile: Option<Profile>,
    subscriptions: Vec<Subscription>,
}

impl Session {
    /// Start a session over an explicit store and authority.
    ///
    /// `current_url` is the address the app was opened with; its tenant
    /// parameter overrides the persisted selection. The override is only
    /// written back once a profile that may switch tenants is loaded.
    pub fn start(
        config: SessionConfig,
        store: Arc<dyn TenantStore>,
        authority: Arc<RoleAuthority>,
        current_url: Option<&str>,
    ) -> Self {
        let url_override = current_url.and_then(|url| tenant_from_query(url, &config.url_param));
        let scope = TenantScope::bootstrap_deferred(store, url_override);

        tracing::info!(tenant_id = ?scope.get(), "session started");

        Self {
            config,
            authority,
            scope,
            profile: None,
            subscriptions: Vec::new(),
        }
    }

    /// Start a session with the file store and the standard authority.
    pub fn start_from_config(
        config: SessionConfig,
        current_url: Option<&str>,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = config.store_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create tenant store directory at {:?}", parent)
            })?;
        }

        let store = Arc::new(FileTenantStore::new(config.store_path.clone()));
        Ok(Self::start(config, store, RoleAuthority::shared(), current_url))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn authority(&self) -> &RoleAuthority {
        &self.authority
    }

    /// Shared handle to the tenant cell, for components that subscribe on
    /// their own.
    pub fn scope(&self) -> &TenantScope {
        &self.scope
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn role(&self) -> Option<&Role> {
        self.profile.as_ref().and_then(Profile::role)
    }

    pub fn load_profile(&mut self, profile: Profile) {
        tracing::debug!(profile_id = %profile.id, role = ?profile.role, "profile loaded");
        self.profile = Some(profile);
        if self.authority.can_switch_tenant(self.role()) {
            self.scope.confirm_override();
        }
    }

    pub fn can(&self, permission: &Permission) -> bool {
        self.authority.has_permission(self.role(), permission)
    }

    pub fn is_at_least(&self, target: &Role) -> bool {
        self.authority.is_at_least(self.role(), target)
    }

    pub fn require(&self, permission: &Permission) -> Result<(), SessionError> {
        authorize(&self.authority, self.profile.as_ref(), permission)?;
        Ok(())
    }

    /// Tenant picker selection; only roles allowed to switch tenants may call it.
    pub fn select_tenant(&self, tenant_id: Option<TenantId>) -> Result<bool, SessionError> {
        self.require(&perms::TENANTS_SWITCH)?;
        Ok(self.scope.set(tenant_id))
    }

    /// Tenant that data requests should be scoped to.
    ///
    /// Roles that may switch tenants act for the selected tenant; everyone
    /// else is pinned to their own profile's tenant.
    pub fn effective_tenant(&self) -> Option<TenantId> {
        if self.authority.can_switch_tenant(self.role()) {
            self.scope.get()
        } else {
            self.profile.as_ref().and_then(|p| p.tenant_id.clone())
        }
    }

    pub fn tenant_state(&self) -> TenantState {
        self.scope.state()
    }

    pub fn request_headers(&self) -> Result<HeaderMap, SessionError> {
        Ok(tenant_headers(self, &self.config.header_name)?)
    }

    /// Internal link carrying the effective tenant.
    pub fn link(&self, href: &str) -> Result<String, SessionError> {
        let tenant = self.effective_tenant();
        Ok(scoped_link(href, &self.config.url_param, tenant.as_ref())?)
    }

    /// Register a reload hook that lives as long as the session.
    pub fn on_tenant_change<F>(&mut self, listener: F)
    where
        F: Fn(&TenantChange) + Send + Sync + 'static,
    {
        let subscription = self.scope.subscribe(listener);
        self.subscriptions.push(subscription);
    }

    /// Tear the session down, releasing its listeners.
    ///
    /// The persisted tenant is kept so the next session resumes it.
    pub fn end(self) -> TenantState {
        let state = self.scope.state();
        tracing::info!(
            tenant_id = ?state.tenant_id,
            listeners = self.subscriptions.len(),
            "session ended"
        );
        state
    }
}

impl TenantScoped for Session {
    fn active_tenant(&self) -> Option<TenantId> {
        self.effective_tenant()
    }
}
