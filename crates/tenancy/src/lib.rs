//! `crm-tenancy` — the active-tenant selector and the contracts that carry
//! the selected tenant onto links and outbound requests.

pub mod error;
pub mod header;
pub mod link;
pub mod scope;
pub mod store;

pub use error::{StoreError, TenancyError};
pub use header::{DEFAULT_TENANT_HEADER, apply_tenant_header, tenant_headers};
pub use link::{DEFAULT_TENANT_PARAM, scoped_link, tenant_from_query};
pub use scope::{
    Subscription, TenantChange, TenantOrigin, TenantScope, TenantScoped, TenantState,
    WeakTenantScope,
};
pub use store::{FileTenantStore, InMemoryTenantStore, PersistedTenant, TenantStore};
