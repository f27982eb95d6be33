//! Tenancy error model.

use thiserror::Error;

/// Failure of a durable tenant store.
///
/// The scope only logs these: persistence is best effort.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("tenant store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tenant store contains invalid data: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("tenant store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TenancyError {
    #[error("invalid tenant header: {0}")]
    InvalidHeader(String),

    #[error("invalid link '{href}': {reason}")]
    InvalidLink { href: String, reason: String },
}
