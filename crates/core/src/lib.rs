//! `crm-core` — identifiers and error primitives shared by the access core.
//!
//! This crate is **pure** (no IO, no logging setup).

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{ProfileId, TenantId};
