use thiserror::Error;

use crm_auth::AuthzError;
use crm_tenancy::TenancyError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Tenancy(#[from] TenancyError),
}
