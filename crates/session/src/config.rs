//! Session configuration.
//!
//! Defaults match the backend contract; each value can be overridden from the
//! environment.

use std::path::PathBuf;

use crm_tenancy::{DEFAULT_TENANT_HEADER, DEFAULT_TENANT_PARAM};

pub const ENV_TENANT_PARAM: &str = "CRM_TENANT_PARAM";
pub const ENV_TENANT_HEADER: &str = "CRM_TENANT_HEADER";
pub const ENV_TENANT_STORE: &str = "CRM_TENANT_STORE";
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Query parameter that overrides the tenant on load.
    pub url_param: String,
    /// Request header carrying the tenant to the backend.
    pub header_name: String,
    /// File holding the last selected tenant.
    pub store_path: PathBuf,
    pub log_filter: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url_param: DEFAULT_TENANT_PARAM.to_string(),
            header_name: DEFAULT_TENANT_HEADER.to_string(),
            store_path: default_store_path(),
            log_filter: "info".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; blank values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            url_param: get(ENV_TENANT_PARAM).unwrap_or(defaults.url_param),
            header_name: get(ENV_TENANT_HEADER).unwrap_or(defaults.header_name),
            store_path: get(ENV_TENANT_STORE)
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            log_filter: get(ENV_LOG_FILTER).unwrap_or(defaults.log_filter),
        }
    }
}

fn default_store_path() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| {
        tracing::warn!("no platform data directory; storing tenant selection in working directory");
        PathBuf::from(".")
    });
    base.join("crm").join("tenant.json")
}
