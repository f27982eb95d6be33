//! Outbound request contract: tenant-scoped calls carry the active tenant id
//! in a request header; without a tenant the header is omitted.

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crm_core::TenantId;

use crate::{TenancyError, TenantScoped};

/// Header that names the tenant on backend requests.
pub const DEFAULT_TENANT_HEADER: &str = "cliente_id";

/// Insert, replace, or remove the tenant header.
pub fn apply_tenant_header(
    headers: &mut HeaderMap,
    name: &str,
    tenant: Option<&TenantId>,
) -> Result<(), TenancyError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| TenancyError::InvalidHeader(format!("name '{}': {}", name, e)))?;

    match tenant {
        Some(tenant) => {
            let value = HeaderValue::from_str(tenant.as_str()).map_err(|e| {
                TenancyError::InvalidHeader(format!("value for tenant '{}': {}", tenant, e))
            })?;
            headers.insert(name, value);
        }
        None => {
            headers.remove(&name);
        }
    }

    Ok(())
}

/// Fresh header map for whatever tenant `source` currently acts for.
pub fn tenant_headers<S>(source: &S, name: &str) -> Result<HeaderMap, TenancyError>
where
    S: TenantScoped + ?Sized,
{
    let mut headers = HeaderMap::new();
    apply_tenant_header(&mut headers, name, source.active_tenant().as_ref())?;
    Ok(headers)
}
